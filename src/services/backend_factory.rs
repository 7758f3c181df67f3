//! Backend factory.
//!
//! Maps a backend kind string to a constructor so the application never names
//! a concrete adapter type.
//!
//! # Architecture
//!
//! ```text
//! BackendFactory
//!   ├── create(kind, collection, settings) → Box<dyn VectorStore>
//!   └── create_with(kind, collection, settings, options, registry)
//!
//! BackendRegistry
//!   ├── "weaviate" → WeaviateBackend::from_settings
//!   ├── "milvus"   → MilvusBackend::from_settings
//!   └── "memory"   → InMemoryBackend::new
//! ```
//!
//! # Kind Resolution
//!
//! The explicit kind wins, then `VECTOR_DB_TYPE`, then `weaviate`. Lookup is
//! case-insensitive. Construction never touches the network; an unreachable
//! backend shows up later as [`ConnectionState::Unavailable`](crate::ConnectionState).

use crate::config::{Settings, VECTOR_DB_TYPE};
use crate::storage::{BackendOptions, InMemoryBackend, MilvusBackend, VectorStore, WeaviateBackend};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Kind used when neither the caller nor `VECTOR_DB_TYPE` picks one.
pub const DEFAULT_BACKEND: &str = WeaviateBackend::KIND;

/// Constructor signature for a backend kind.
pub type BackendConstructor =
    fn(collection_name: &str, settings: &Settings, options: &BackendOptions) -> Result<Box<dyn VectorStore>>;

/// Open registry of backend constructors keyed by lowercase kind.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    constructors: BTreeMap<String, BackendConstructor>,
}

impl BackendRegistry {
    /// Creates a registry with no kinds.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Creates a registry with the built-in kinds.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::empty()
            .with(WeaviateBackend::KIND, create_weaviate)
            .with(MilvusBackend::KIND, create_milvus)
            .with(InMemoryBackend::KIND, create_memory)
    }

    /// Registers a kind, replacing any previous constructor for it.
    pub fn register(&mut self, kind: &str, constructor: BackendConstructor) {
        self.constructors.insert(kind.to_lowercase(), constructor);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, kind: &str, constructor: BackendConstructor) -> Self {
        self.register(kind, constructor);
        self
    }

    /// Registered kinds in sorted order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Looks up a constructor, ignoring case.
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<BackendConstructor> {
        self.constructors.get(&kind.trim().to_lowercase()).copied()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn create_weaviate(
    collection_name: &str,
    settings: &Settings,
    options: &BackendOptions,
) -> Result<Box<dyn VectorStore>> {
    Ok(Box::new(WeaviateBackend::from_settings(collection_name, settings, options)?))
}

fn create_milvus(
    collection_name: &str,
    settings: &Settings,
    options: &BackendOptions,
) -> Result<Box<dyn VectorStore>> {
    Ok(Box::new(MilvusBackend::from_settings(collection_name, settings, options)?))
}

fn create_memory(
    collection_name: &str,
    _settings: &Settings,
    options: &BackendOptions,
) -> Result<Box<dyn VectorStore>> {
    Ok(Box::new(InMemoryBackend::new(collection_name, options)))
}

/// Factory for creating vector store backends.
///
/// # Example
///
/// ```rust,ignore
/// use ragstore::{BackendFactory, Settings};
///
/// let settings = Settings::from_env();
/// let store = BackendFactory::create(Some("Milvus"), "RagMeDocs", &settings)?;
/// assert_eq!(store.identify(), "milvus");
/// ```
pub struct BackendFactory;

impl BackendFactory {
    /// Creates a backend with default options and the built-in registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the kind is unknown or the chosen
    /// backend's settings are missing or invalid.
    pub fn create(
        kind: Option<&str>,
        collection_name: &str,
        settings: &Settings,
    ) -> Result<Box<dyn VectorStore>> {
        Self::create_with(
            kind,
            collection_name,
            settings,
            &BackendOptions::default(),
            &BackendRegistry::with_defaults(),
        )
    }

    /// Creates a backend with explicit options and registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the kind is unknown or the chosen
    /// backend's settings are missing or invalid.
    pub fn create_with(
        kind: Option<&str>,
        collection_name: &str,
        settings: &Settings,
        options: &BackendOptions,
        registry: &BackendRegistry,
    ) -> Result<Box<dyn VectorStore>> {
        let kind = Self::resolve_kind(kind, settings);
        let constructor = registry.get(&kind).ok_or_else(|| {
            Error::Configuration(format!(
                "unknown vector database type '{kind}' (supported: {})",
                registry.kinds().join(", ")
            ))
        })?;

        let store = constructor(collection_name, settings, options)?;
        tracing::debug!(
            backend = store.identify(),
            collection = collection_name,
            "vector store created"
        );
        Ok(store)
    }

    /// Resolves the kind: explicit value, then `VECTOR_DB_TYPE`, then the default.
    #[must_use]
    pub fn resolve_kind(kind: Option<&str>, settings: &Settings) -> String {
        kind.map(str::trim)
            .filter(|k| !k.is_empty())
            .or_else(|| settings.get(VECTOR_DB_TYPE))
            .unwrap_or(DEFAULT_BACKEND)
            .to_string()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ConnectionState;
    use test_case::test_case;

    fn settings() -> Settings {
        Settings::new()
            .with("WEAVIATE_URL", "http://localhost:8080")
            .with("MILVUS_URI", "http://localhost:19530")
    }

    #[test_case("weaviate", "weaviate" ; "weaviate lowercase")]
    #[test_case("WEAVIATE", "weaviate" ; "weaviate uppercase")]
    #[test_case("Milvus", "milvus" ; "milvus mixed case")]
    #[test_case("memory", "memory" ; "memory")]
    fn test_create_is_case_insensitive(kind: &str, expected: &str) {
        let store = BackendFactory::create(Some(kind), "RagMeDocs", &settings()).expect("create");
        assert_eq!(store.identify(), expected);
        assert_eq!(store.collection_name(), "RagMeDocs");
        assert_eq!(store.connection_state(), ConnectionState::Uninitialized);
    }

    #[test]
    fn test_unknown_kind_names_value() {
        let err = BackendFactory::create(Some("pinecone"), "RagMeDocs", &settings())
            .err()
            .expect("unknown kind");
        assert!(matches!(err, Error::Configuration(ref msg) if msg.contains("pinecone")));
    }

    #[test]
    fn test_kind_resolution_order() {
        let env = settings().with(VECTOR_DB_TYPE, "milvus");
        assert_eq!(BackendFactory::resolve_kind(Some("memory"), &env), "memory");
        assert_eq!(BackendFactory::resolve_kind(None, &env), "milvus");
        assert_eq!(BackendFactory::resolve_kind(Some("  "), &env), "milvus");
        assert_eq!(BackendFactory::resolve_kind(None, &Settings::new()), "weaviate");
    }

    #[test]
    fn test_missing_backend_settings() {
        let err = BackendFactory::create(Some("weaviate"), "RagMeDocs", &Settings::new())
            .err()
            .expect("missing url");
        assert!(matches!(err, Error::Configuration(ref msg) if msg.contains("WEAVIATE_URL")));
    }

    #[test]
    fn test_registry_is_open() {
        let mut registry = BackendRegistry::empty();
        assert!(registry.kinds().is_empty());
        registry.register("Scratch", create_memory);
        assert_eq!(registry.kinds(), vec!["scratch"]);

        let store = BackendFactory::create_with(
            Some("SCRATCH"),
            "Docs",
            &Settings::new(),
            &BackendOptions::default(),
            &registry,
        )
        .expect("create");
        assert_eq!(store.identify(), "memory");
    }

    #[test]
    fn test_identify_round_trips() {
        for kind in BackendRegistry::with_defaults().kinds() {
            let store = BackendFactory::create(Some(kind), "RagMeDocs", &settings()).expect("create");
            let again = BackendFactory::create(Some(store.identify()), "RagMeDocs", &settings())
                .expect("recreate");
            assert_eq!(again.identify(), store.identify());
        }
    }
}
