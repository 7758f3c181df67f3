//! Vector store contract.
//!
//! Every backend adapter implements [`VectorStore`]; the application holds a
//! `Box<dyn VectorStore>` and never touches a native client.
//!
//! # Available Implementations
//!
//! | Backend | Kind | Embeds internally | Configuration |
//! |---------|------|-------------------|---------------|
//! | `WeaviateBackend` | `weaviate` | yes (vectorizer module) or none needed for BM25 | `WEAVIATE_URL`, `WEAVIATE_API_KEY` |
//! | `MilvusBackend` | `milvus` | no, `vector` required | `MILVUS_URI`, `MILVUS_TOKEN`, `MILVUS_DIMENSION` |
//! | `InMemoryBackend` | `memory` | not needed | none |
//!
//! # Lifecycle
//!
//! ```text
//!                 setup() / first use
//!  UNINITIALIZED ───────────────────────▶ CONNECTED
//!        │                                    ▲
//!        │ connection fails                   │ setup() after the fault clears
//!        ▼                                    │
//!   UNAVAILABLE ──────────────────────────────┘
//!
//!  cleanup() from any state ▶ UNINITIALIZED
//! ```
//!
//! While UNAVAILABLE every call is a no-op with a neutral result and a
//! warning: `write` drops the batch, `list` returns nothing, queries answer
//! "service unavailable". Check [`VectorStore::connection_state`] to tell a
//! degraded call from a real empty result.

use crate::Result;
use crate::embedding::Embedder;
use crate::models::{Document, QueryAnswer};
use std::fmt;
use std::sync::Arc;

/// Connection state of a backend instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No client has been created yet (or it was released by `cleanup`).
    Uninitialized,
    /// A live client exists and the collection is ensured.
    Connected,
    /// Client creation failed; calls degrade to neutral results.
    Unavailable,
}

impl ConnectionState {
    /// Returns the state as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Connected => "connected",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers natural-language queries scoped to one collection.
pub trait QueryAgent: Send + Sync {
    /// Answers a query.
    ///
    /// Returns a [`QueryAnswer`] with status `ServiceUnavailable` rather than
    /// an error when the backend cannot be reached.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures outside the backend, such as the
    /// query embedding failing.
    fn query(&self, text: &str) -> Result<QueryAnswer>;
}

/// Trait for vector store backends.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn VectorStore>`
/// - Construction must not perform network I/O; connect lazily
/// - The native client is owned by exactly one instance
/// - No lock may be held across a native call
pub trait VectorStore: Send + Sync {
    /// Short constant naming the backend kind (e.g. `weaviate`).
    ///
    /// Passing this value back to the factory selects the same kind.
    fn identify(&self) -> &'static str;

    /// The collection (namespace) this instance reads and writes.
    fn collection_name(&self) -> &str;

    /// Current lifecycle state.
    fn connection_state(&self) -> ConnectionState;

    /// Whether documents must carry an embedding to be written.
    fn requires_external_embedding(&self) -> bool;

    /// The embedder this backend embeds queries with, if it embeds them itself.
    ///
    /// Callers filling in missing document vectors should use the same one so
    /// stored and query vectors share a space.
    fn query_embedder(&self) -> Option<Arc<dyn Embedder>> {
        None
    }

    /// Connects and ensures the collection exists, creating it if absent.
    ///
    /// Idempotent. An unreachable backend is not an error: the instance moves
    /// to [`ConnectionState::Unavailable`] and a warning is emitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`](crate::Error::Configuration) only for
    /// configuration problems.
    fn setup(&self) -> Result<()>;

    /// Writes a batch of documents.
    ///
    /// The batch is validated first; the first invalid record rejects the
    /// whole batch. Written documents become visible to later `list` and
    /// query calls, with backend-dependent latency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::Error::Validation) naming the
    /// 1-based position of the first invalid record.
    fn write(&self, documents: &[Document]) -> Result<()>;

    /// Lists up to `limit` documents starting at `offset`.
    ///
    /// The order is backend-defined but stable within a session. An offset
    /// past the end yields an empty list.
    ///
    /// # Errors
    ///
    /// Backends return errors here only for configuration problems.
    fn list(&self, limit: usize, offset: usize) -> Result<Vec<Document>>;

    /// Creates a query agent scoped to this collection.
    ///
    /// Performs no network I/O. Answers draw on at most
    /// [`DEFAULT_QUERY_LIMIT`](crate::storage::DEFAULT_QUERY_LIMIT) documents.
    fn create_query_agent(&self) -> Box<dyn QueryAgent> {
        self.create_query_agent_with_limit(crate::storage::DEFAULT_QUERY_LIMIT)
    }

    /// Creates a query agent whose answers draw on at most `limit` documents.
    ///
    /// Performs no network I/O.
    fn create_query_agent_with_limit(&self, limit: usize) -> Box<dyn QueryAgent>;

    /// Releases the native client. Safe to call repeatedly and from any state.
    fn cleanup(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Uninitialized.to_string(), "uninitialized");
        assert_eq!(ConnectionState::Connected.as_str(), "connected");
        assert_eq!(ConnectionState::Unavailable.as_str(), "unavailable");
    }
}
