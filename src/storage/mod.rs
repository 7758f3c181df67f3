//! Storage layer abstraction.
//!
//! This module provides the vector store contract and its adapters:
//! - **Contract**: [`VectorStore`] and [`QueryAgent`] (see [`traits`])
//! - **Lifecycle**: lazy connection and graceful degradation ([`lifecycle`])
//! - **Validation**: write-path document checks ([`validation`])
//! - **Adapters**: Weaviate, Milvus, and an in-process store ([`vector`])

mod http;
pub mod lifecycle;
pub mod traits;
pub mod validation;
pub mod vector;

pub use lifecycle::Lifecycle;
pub use traits::{ConnectionState, QueryAgent, VectorStore};
pub use validation::{DocumentRequirements, validate_batch};
pub use vector::{InMemoryBackend, MilvusBackend, WeaviateBackend};

use crate::embedding::Embedder;
use crate::observability::{DiagnosticSink, TracingDiagnostics};
use std::fmt;
use std::sync::Arc;

/// Number of documents a query agent draws on by default.
pub const DEFAULT_QUERY_LIMIT: usize = 5;

/// Per-instance options passed to backend constructors.
#[derive(Clone)]
pub struct BackendOptions {
    /// Receives warnings from degraded calls.
    pub diagnostics: Arc<dyn DiagnosticSink>,
    /// Embeds query text for backends that search by vector.
    ///
    /// Its dimension must match the backend's collection.
    pub embedder: Option<Arc<dyn Embedder>>,
}

impl BackendOptions {
    /// Options with a tracing sink and no embedder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the diagnostic sink.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Sets the query embedder.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            diagnostics: Arc::new(TracingDiagnostics),
            embedder: None,
        }
    }
}

impl fmt::Debug for BackendOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendOptions")
            .field(
                "embedder_dimensions",
                &self.embedder.as_ref().map(|e| e.dimensions()),
            )
            .finish_non_exhaustive()
    }
}
