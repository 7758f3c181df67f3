//! # ragstore
//!
//! Pluggable vector-store backends for retrieval-augmented generation.
//!
//! An application writes documents, lists them, and asks natural-language
//! questions against an interchangeable vector database without depending on
//! that database's native client API.
//!
//! ## Features
//!
//! - One storage contract ([`VectorStore`]) implemented by every backend
//! - Weaviate and Milvus adapters over their REST APIs, plus an in-process store
//! - Case-insensitive backend selection through an open registry
//! - Lazy connection with an explicit three-state lifecycle
//! - Graceful degradation: an unreachable backend yields warnings and neutral
//!   results instead of errors
//!
//! ## Example
//!
//! ```rust,ignore
//! use ragstore::config::Settings;
//! use ragstore::services::RagService;
//!
//! let settings = Settings::from_env();
//! let rag = RagService::from_settings(None, &settings)?;
//! rag.setup()?;
//! rag.write_webpages(&[("https://example.com".into(), "Example page body".into())])?;
//! let answer = rag.ask("What is on the example page?")?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod embedding;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::Settings;
pub use embedding::{Embedder, HashEmbedder};
pub use models::{AnswerStatus, Document, QueryAnswer};
pub use observability::{BackendWarning, DiagnosticSink, RecordingDiagnostics};
pub use services::{BackendFactory, BackendRegistry, RagService};
pub use storage::{BackendOptions, ConnectionState, QueryAgent, VectorStore};

/// Error type for ragstore operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Configuration` | Unknown backend kind, missing connection parameters, invalid collection name |
/// | `Validation` | A document in a write batch lacks a required field |
/// | `BackendUnavailable` | The native client cannot reach or use the vector database |
/// | `OperationFailed` | Local work outside the backend contract fails (file I/O, embedding) |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Bad or missing setup input.
    ///
    /// Raised only while constructing a backend or during `setup()`. Never
    /// retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A document failed validation on the write path.
    ///
    /// The whole batch is rejected; nothing is written.
    #[error("invalid document at position {position}: {reason}")]
    Validation {
        /// 1-based position of the first offending record in the batch.
        position: usize,
        /// What was wrong with the record.
        reason: String,
    },

    /// The backend could not be reached or refused the request.
    ///
    /// Contract methods convert this into a warning and a neutral result;
    /// it only escapes from adapter internals and connection probes.
    #[error("backend '{backend}' unavailable during '{operation}': {cause}")]
    BackendUnavailable {
        /// Backend kind, as returned by `identify()`.
        backend: String,
        /// The operation that was attempted.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A local operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns true if retrying the same call may succeed without changing input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}

/// Result type alias for ragstore operations.
pub type Result<T> = std::result::Result<T, Error>;
