//! In-process vector store.
//!
//! Keeps documents in insertion order inside the instance. Useful for tests,
//! demos, and applications that do not need persistence. The data outlives
//! `cleanup()` (which only drops the handle) but not the instance.

use crate::models::{Document, QueryAnswer};
use crate::storage::lifecycle::Lifecycle;
use crate::storage::traits::{ConnectionState, QueryAgent, VectorStore};
use crate::storage::validation::{DocumentRequirements, validate_batch};
use crate::storage::{BackendOptions, http};
use crate::Result;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

type Store = Arc<RwLock<Vec<Document>>>;

/// In-process backend implementing the full storage contract.
pub struct InMemoryBackend {
    inner: Arc<Inner>,
}

struct Inner {
    collection_name: String,
    store: Store,
    reachable: bool,
    lifecycle: Lifecycle<Store>,
}

impl InMemoryBackend {
    /// Backend kind.
    pub const KIND: &'static str = "memory";

    /// Creates an empty in-process backend.
    #[must_use]
    pub fn new(collection_name: impl Into<String>, options: &BackendOptions) -> Self {
        Self::build(collection_name.into(), options, true)
    }

    /// Creates a backend whose connection always fails.
    ///
    /// Every call degrades, exercising the UNAVAILABLE path without a network.
    #[must_use]
    pub fn unreachable(collection_name: impl Into<String>, options: &BackendOptions) -> Self {
        Self::build(collection_name.into(), options, false)
    }

    fn build(collection_name: String, options: &BackendOptions, reachable: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                collection_name,
                store: Arc::new(RwLock::new(Vec::new())),
                reachable,
                lifecycle: Lifecycle::new(Self::KIND, options.diagnostics.clone()),
            }),
        }
    }

    /// Number of stored documents, regardless of connection state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Inner {
    fn connect(&self) -> Result<Store> {
        if !self.reachable {
            return Err(http::unavailable(
                InMemoryBackend::KIND,
                "connect",
                "store is configured as unreachable",
            ));
        }
        Ok(self.store.clone())
    }

    fn search(store: &Store, text: &str, limit: usize) -> Vec<Document> {
        let terms: HashSet<String> = tokenize(text).collect();
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let docs = store.read().unwrap_or_else(PoisonError::into_inner);
        let mut scored: Vec<(usize, usize)> = docs
            .iter()
            .enumerate()
            .filter_map(|(idx, doc)| {
                let hits = tokenize(&doc.text)
                    .chain(tokenize(&doc.locator))
                    .filter(|t| terms.contains(t))
                    .count();
                (hits > 0).then_some((idx, hits))
            })
            .collect();

        // Highest score first; ties keep insertion order.
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(limit)
            .map(|(idx, _)| docs[idx].clone())
            .collect()
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

impl VectorStore for InMemoryBackend {
    fn identify(&self) -> &'static str {
        Self::KIND
    }

    fn collection_name(&self) -> &str {
        &self.inner.collection_name
    }

    fn connection_state(&self) -> ConnectionState {
        self.inner.lifecycle.state()
    }

    fn requires_external_embedding(&self) -> bool {
        false
    }

    fn setup(&self) -> Result<()> {
        self.inner.lifecycle.setup(|| self.inner.connect())
    }

    fn write(&self, documents: &[Document]) -> Result<()> {
        validate_batch(documents, DocumentRequirements::none())?;
        if documents.is_empty() {
            return Ok(());
        }

        self.inner.lifecycle.run(
            "write",
            || self.inner.connect(),
            || (),
            |store| {
                store
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(documents);
                Ok(())
            },
        )
    }

    fn list(&self, limit: usize, offset: usize) -> Result<Vec<Document>> {
        self.inner.lifecycle.run(
            "list",
            || self.inner.connect(),
            Vec::new,
            |store| {
                let docs = store.read().unwrap_or_else(PoisonError::into_inner);
                Ok(docs.iter().skip(offset).take(limit).cloned().collect())
            },
        )
    }

    fn create_query_agent_with_limit(&self, limit: usize) -> Box<dyn QueryAgent> {
        Box::new(InMemoryQueryAgent {
            inner: self.inner.clone(),
            limit,
        })
    }

    fn cleanup(&self) {
        self.inner.lifecycle.release();
    }
}

/// Keyword-overlap query agent over an [`InMemoryBackend`].
struct InMemoryQueryAgent {
    inner: Arc<Inner>,
    limit: usize,
}

impl QueryAgent for InMemoryQueryAgent {
    fn query(&self, text: &str) -> Result<QueryAnswer> {
        self.inner.lifecycle.run(
            "query",
            || self.inner.connect(),
            || QueryAnswer::unavailable(InMemoryBackend::KIND),
            |store| {
                Ok(QueryAnswer::from_sources(Inner::search(
                    store, text, self.limit,
                )))
            },
        )
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::AnswerStatus;
    use crate::observability::RecordingDiagnostics;
    use crate::Error;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new("Docs", &BackendOptions::default())
    }

    fn docs(n: usize) -> Vec<Document> {
        (1..=n)
            .map(|i| Document::new(format!("https://example.com/{i}"), format!("document number {i}")))
            .collect()
    }

    #[test]
    fn test_construction_is_lazy() {
        let backend = backend();
        assert_eq!(backend.connection_state(), ConnectionState::Uninitialized);
        assert_eq!(backend.identify(), "memory");
        assert_eq!(backend.collection_name(), "Docs");
    }

    #[test]
    fn test_write_connects_lazily_and_lists_in_order() {
        let backend = backend();
        backend.write(&docs(3)).expect("write");
        assert_eq!(backend.connection_state(), ConnectionState::Connected);

        let listed = backend.list(10, 0).expect("list");
        let locators: Vec<_> = listed.iter().map(|d| d.locator.as_str()).collect();
        assert_eq!(
            locators,
            vec![
                "https://example.com/1",
                "https://example.com/2",
                "https://example.com/3"
            ]
        );
    }

    #[test]
    fn test_list_paging() {
        let backend = backend();
        backend.write(&docs(5)).expect("write");
        assert_eq!(backend.list(2, 1).expect("list").len(), 2);
        assert_eq!(backend.list(10, 4).expect("list").len(), 1);
        assert!(backend.list(10, 5).expect("list").is_empty());
        assert!(backend.list(0, 0).expect("list").is_empty());
    }

    #[test]
    fn test_list_empty_collection() {
        assert!(backend().list(10, 0).expect("list").is_empty());
    }

    #[test]
    fn test_invalid_batch_writes_nothing() {
        let backend = backend();
        let mut batch = docs(5);
        batch[2].locator.clear();

        let err = backend.write(&batch).unwrap_err();
        assert!(matches!(err, Error::Validation { position: 3, .. }));
        assert!(backend.is_empty());
    }

    #[test]
    fn test_unreachable_degrades() {
        let sink = Arc::new(RecordingDiagnostics::new());
        let options = BackendOptions::default().with_diagnostics(sink.clone());
        let backend = InMemoryBackend::unreachable("Docs", &options);

        backend.setup().expect("setup never fails on unavailability");
        assert_eq!(backend.connection_state(), ConnectionState::Unavailable);

        backend.write(&docs(2)).expect("write degrades");
        assert!(backend.is_empty());
        assert!(backend.list(10, 0).expect("list degrades").is_empty());

        let answer = backend
            .create_query_agent()
            .query("document")
            .expect("query degrades");
        assert_eq!(answer.status, AnswerStatus::ServiceUnavailable);

        assert_eq!(sink.warnings_for("setup").len(), 1);
        assert_eq!(sink.warnings_for("write").len(), 1);
        assert_eq!(sink.warnings_for("list").len(), 1);
        assert_eq!(sink.warnings_for("query").len(), 1);
    }

    #[test]
    fn test_query_ranks_by_overlap() {
        let backend = backend();
        backend
            .write(&[
                Document::new("a", "rust ownership and borrowing"),
                Document::new("b", "weaviate schema"),
                Document::new("c", "rust borrowing rules explained for rust users"),
            ])
            .expect("write");

        let answer = backend
            .create_query_agent_with_limit(2)
            .query("Rust borrowing?")
            .expect("query");
        assert_eq!(answer.status, AnswerStatus::Answered);
        let ranked: Vec<_> = answer.sources.iter().map(|d| d.locator.as_str()).collect();
        assert_eq!(ranked, vec!["c", "a"]);
    }

    #[test]
    fn test_query_without_matches() {
        let backend = backend();
        backend.write(&docs(2)).expect("write");
        let answer = backend.create_query_agent().query("zebra").expect("query");
        assert_eq!(answer.status, AnswerStatus::NoResults);
    }

    #[test]
    fn test_cleanup_keeps_data_and_is_idempotent() {
        let backend = backend();
        backend.cleanup();
        backend.write(&docs(2)).expect("write");
        backend.cleanup();
        backend.cleanup();
        assert_eq!(backend.connection_state(), ConnectionState::Uninitialized);
        assert_eq!(backend.list(10, 0).expect("list").len(), 2);
    }
}
