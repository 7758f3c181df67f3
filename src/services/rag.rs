//! Application facade over a single vector store.

use super::BackendFactory;
use crate::config::Settings;
use crate::embedding::Embedder;
use crate::models::{Document, QueryAnswer};
use crate::storage::{BackendOptions, ConnectionState, QueryAgent, VectorStore};
use crate::{Error, Result};
use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

/// Holds one backend and delegates storage operations to it.
///
/// The query agent is created on the first [`ask`](Self::ask) and reused.
///
/// # Example
///
/// ```rust,ignore
/// use ragstore::{RagService, Settings};
///
/// let rag = RagService::from_settings(None, &Settings::from_env())?;
/// rag.setup()?;
/// rag.write_webpages(&[("https://example.com".into(), "Example Domain".into())])?;
/// println!("{}", rag.ask("What is example.com?")?.answer);
/// ```
pub struct RagService {
    store: Box<dyn VectorStore>,
    embedder: Option<Arc<dyn Embedder>>,
    agent: OnceLock<Box<dyn QueryAgent>>,
}

impl RagService {
    /// Wraps an existing backend.
    ///
    /// Missing vectors are filled with the backend's own query embedder, if
    /// it has one.
    #[must_use]
    pub fn new(store: Box<dyn VectorStore>) -> Self {
        let embedder = store.query_embedder();
        Self {
            store,
            embedder,
            agent: OnceLock::new(),
        }
    }

    /// Builds the backend through the factory with default options.
    ///
    /// The collection comes from `RAGSTORE_COLLECTION`, defaulting to `RagMeDocs`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the backend cannot be constructed.
    pub fn from_settings(kind: Option<&str>, settings: &Settings) -> Result<Self> {
        Self::from_settings_with(kind, settings, &BackendOptions::default())
    }

    /// Builds the backend through the factory with explicit options.
    ///
    /// The options' embedder, if any, is also used to fill missing vectors;
    /// otherwise the backend's query embedder is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the backend cannot be constructed.
    pub fn from_settings_with(
        kind: Option<&str>,
        settings: &Settings,
        options: &BackendOptions,
    ) -> Result<Self> {
        let store = BackendFactory::create_with(
            kind,
            settings.collection_name(),
            settings,
            options,
            &super::BackendRegistry::with_defaults(),
        )?;
        let mut service = Self::new(store);
        if let Some(embedder) = &options.embedder {
            service.embedder = Some(embedder.clone());
        }
        Ok(service)
    }

    /// Fills missing vectors with `embedder` when the backend needs them.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// The underlying backend.
    #[must_use]
    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    /// Backend kind.
    #[must_use]
    pub fn identify(&self) -> &'static str {
        self.store.identify()
    }

    /// Backend connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.store.connection_state()
    }

    /// Connects and ensures the collection exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for configuration problems only.
    pub fn setup(&self) -> Result<()> {
        self.store.setup()
    }

    /// Writes documents, embedding any that lack a vector when required.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an invalid batch, or
    /// [`Error::OperationFailed`] if embedding fails.
    pub fn write_documents(&self, documents: &[Document]) -> Result<()> {
        let documents = self.prepare(documents)?;
        self.store.write(&documents)
    }

    /// Writes fetched web pages as `(url, text)` pairs.
    ///
    /// Each document carries `{"type": "webpage", "url": <url>}` metadata.
    ///
    /// # Errors
    ///
    /// Same as [`write_documents`](Self::write_documents).
    pub fn write_webpages(&self, pages: &[(String, String)]) -> Result<()> {
        let documents: Vec<Document> = pages
            .iter()
            .map(|(url, text)| Document::webpage(url.as_str(), text.as_str()))
            .collect();
        self.write_documents(&documents)
    }

    /// Lists stored documents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for configuration problems only.
    pub fn list_documents(&self, limit: usize, offset: usize) -> Result<Vec<Document>> {
        self.store.list(limit, offset)
    }

    /// Answers a question from the stored documents.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures outside the backend.
    pub fn ask(&self, question: &str) -> Result<QueryAnswer> {
        let agent = self.agent.get_or_init(|| self.store.create_query_agent());
        let answer = agent.query(question)?;
        tracing::debug!(
            backend = self.store.identify(),
            status = answer.status.as_str(),
            sources = answer.sources.len(),
            "question answered"
        );
        Ok(answer)
    }

    /// Answers a question drawing on at most `limit` documents.
    ///
    /// Uses a one-off agent; the cached agent is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures outside the backend.
    pub fn ask_with_limit(&self, question: &str, limit: usize) -> Result<QueryAnswer> {
        self.store
            .create_query_agent_with_limit(limit)
            .query(question)
    }

    /// Releases the backend client. Safe to call repeatedly.
    pub fn cleanup(&self) {
        self.store.cleanup();
    }

    fn prepare<'a>(&self, documents: &'a [Document]) -> Result<Cow<'a, [Document]>> {
        let Some(embedder) = &self.embedder else {
            return Ok(Cow::Borrowed(documents));
        };
        if !self.store.requires_external_embedding()
            || documents.iter().all(|d| d.embedding().is_some())
        {
            return Ok(Cow::Borrowed(documents));
        }

        let mut owned = documents.to_vec();
        let missing: Vec<usize> = owned
            .iter()
            .enumerate()
            .filter(|(_, d)| d.embedding().is_none())
            .map(|(i, _)| i)
            .collect();
        let texts: Vec<&str> = missing.iter().map(|&i| documents[i].text.as_str()).collect();
        let vectors = embedder.embed_batch(&texts).map_err(|e| match e {
            Error::OperationFailed { .. } => e,
            other => Error::OperationFailed {
                operation: "embed".to_string(),
                cause: other.to_string(),
            },
        })?;
        if vectors.len() != missing.len() {
            return Err(Error::OperationFailed {
                operation: "embed".to_string(),
                cause: format!("expected {} vectors, got {}", missing.len(), vectors.len()),
            });
        }
        for (index, vector) in missing.into_iter().zip(vectors) {
            owned[index].embedding = Some(vector);
        }
        Ok(Cow::Owned(owned))
    }
}
