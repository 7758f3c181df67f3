//! Configuration management.
//!
//! Configuration is an immutable [`Settings`] snapshot of the recognized
//! environment keys. The snapshot is handed to the backend factory and the
//! application facade explicitly; nothing in the library reads the process
//! environment behind the caller's back.

mod backends;

pub use backends::{MilvusConfig, WeaviateConfig, WeaviateQueryMode};

use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Selects the backend kind.
pub const VECTOR_DB_TYPE: &str = "VECTOR_DB_TYPE";
/// Weaviate endpoint URL.
pub const WEAVIATE_URL: &str = "WEAVIATE_URL";
/// Weaviate API key.
pub const WEAVIATE_API_KEY: &str = "WEAVIATE_API_KEY";
/// Weaviate query strategy (`bm25` or `near_text`).
pub const WEAVIATE_QUERY_MODE: &str = "WEAVIATE_QUERY_MODE";
/// Milvus endpoint URI.
pub const MILVUS_URI: &str = "MILVUS_URI";
/// Milvus access token.
pub const MILVUS_TOKEN: &str = "MILVUS_TOKEN";
/// Milvus vector dimension.
pub const MILVUS_DIMENSION: &str = "MILVUS_DIMENSION";
/// Default collection name.
pub const RAGSTORE_COLLECTION: &str = "RAGSTORE_COLLECTION";
/// HTTP request timeout in seconds.
pub const RAGSTORE_TIMEOUT_SECS: &str = "RAGSTORE_TIMEOUT_SECS";

/// All keys captured by [`Settings::from_env`].
pub const RECOGNIZED_KEYS: &[&str] = &[
    VECTOR_DB_TYPE,
    WEAVIATE_URL,
    WEAVIATE_API_KEY,
    WEAVIATE_QUERY_MODE,
    MILVUS_URI,
    MILVUS_TOKEN,
    MILVUS_DIMENSION,
    RAGSTORE_COLLECTION,
    RAGSTORE_TIMEOUT_SECS,
];

/// Collection name used when none is configured.
pub const DEFAULT_COLLECTION: &str = "RagMeDocs";

/// Request timeout used when `RAGSTORE_TIMEOUT_SECS` is unset.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable key/value snapshot of ragstore configuration.
///
/// Blank values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    /// Creates an empty settings snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures recognized keys from a `.env` file (if present) and the process
    /// environment. Process environment wins over the file.
    #[must_use]
    pub fn from_env() -> Self {
        let mut settings = Self::new();
        if let Ok(iter) = dotenvy::dotenv_iter() {
            settings.absorb_dotenv(iter);
        }
        settings.absorb_process_env();
        settings
    }

    /// Captures recognized keys from the given env file and the process
    /// environment. Process environment wins over the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file cannot be read or parsed.
    pub fn from_env_file(path: &Path) -> Result<Self> {
        let iter = dotenvy::from_path_iter(path).map_err(|e| {
            Error::Configuration(format!("cannot read env file {}: {e}", path.display()))
        })?;
        let mut settings = Self::new();
        for item in iter {
            let (key, value) = item.map_err(|e| {
                Error::Configuration(format!("cannot parse env file {}: {e}", path.display()))
            })?;
            if RECOGNIZED_KEYS.contains(&key.as_str()) {
                settings.insert(key, value);
            }
        }
        settings.absorb_process_env();
        Ok(settings)
    }

    /// Builds settings from explicit key/value pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut settings = Self::new();
        for (key, value) in pairs {
            settings.insert(key.into(), value.into());
        }
        settings
    }

    /// Returns a copy with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key.into(), value.into());
        self
    }

    /// Looks up a value. Blank values read as `None`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Looks up and parses a value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the key if the value does not parse.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| {
                    Error::Configuration(format!("invalid value for {key}: '{raw}' ({e})"))
                })
            })
            .transpose()
    }

    /// The configured collection name, or [`DEFAULT_COLLECTION`].
    #[must_use]
    pub fn collection_name(&self) -> &str {
        self.get(RAGSTORE_COLLECTION).unwrap_or(DEFAULT_COLLECTION)
    }

    /// The HTTP request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `RAGSTORE_TIMEOUT_SECS` is not a
    /// positive integer.
    pub fn request_timeout(&self) -> Result<Duration> {
        match self.parse::<u64>(RAGSTORE_TIMEOUT_SECS)? {
            None => Ok(DEFAULT_TIMEOUT),
            Some(0) => Err(Error::Configuration(format!(
                "{RAGSTORE_TIMEOUT_SECS} must be greater than zero"
            ))),
            Some(secs) => Ok(Duration::from_secs(secs)),
        }
    }

    fn insert(&mut self, key: String, value: String) {
        let value = value.trim();
        if value.is_empty() {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value.to_string());
        }
    }

    fn absorb_dotenv<I>(&mut self, iter: I)
    where
        I: Iterator<Item = std::result::Result<(String, String), dotenvy::Error>>,
    {
        for (key, value) in iter.flatten() {
            if RECOGNIZED_KEYS.contains(&key.as_str()) {
                self.insert(key, value);
            }
        }
    }

    fn absorb_process_env(&mut self) {
        for key in RECOGNIZED_KEYS {
            if let Ok(value) = std::env::var(key) {
                self.insert((*key).to_string(), value);
            }
        }
    }
}
