//! Integration tests for ragstore.
//!
//! Network backends are pointed at `127.0.0.1:1`, which refuses connections,
//! to exercise the degradation paths without a running database.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use ragstore::config::Settings;
use ragstore::services::BackendRegistry;
use ragstore::storage::{BackendOptions, ConnectionState, InMemoryBackend, VectorStore};
use ragstore::{AnswerStatus, BackendFactory, Document, Error, HashEmbedder, RagService, RecordingDiagnostics};
use std::sync::Arc;
use test_case::test_case;

const UNREACHABLE: &str = "http://127.0.0.1:1";

fn unreachable_settings() -> Settings {
    Settings::new()
        .with("WEAVIATE_URL", UNREACHABLE)
        .with("MILVUS_URI", UNREACHABLE)
        .with("MILVUS_DIMENSION", "8")
        .with("RAGSTORE_TIMEOUT_SECS", "2")
}

fn recording() -> (BackendOptions, Arc<RecordingDiagnostics>) {
    let sink = Arc::new(RecordingDiagnostics::new());
    (BackendOptions::default().with_diagnostics(sink.clone()), sink)
}

fn create(kind: &str, options: &BackendOptions) -> Box<dyn VectorStore> {
    BackendFactory::create_with(
        Some(kind),
        "RagMeDocs",
        &unreachable_settings(),
        options,
        &BackendRegistry::with_defaults(),
    )
    .expect("create backend")
}

fn docs(n: usize, dimension: usize) -> Vec<Document> {
    (1..=n)
        .map(|i| {
            Document::new(format!("https://example.com/{i}"), format!("page {i}"))
                .with_embedding(vec![0.5; dimension])
        })
        .collect()
}

#[test]
fn test_error_display() {
    let err = Error::Validation {
        position: 3,
        reason: "locator (url) is missing or empty".to_string(),
    };
    let display = err.to_string();
    assert!(display.contains('3'));
    assert!(display.contains("locator"));
    assert!(!err.is_retryable());

    let err = Error::BackendUnavailable {
        backend: "milvus".to_string(),
        operation: "write".to_string(),
        cause: "connection refused".to_string(),
    };
    assert!(err.to_string().contains("milvus"));
    assert!(err.is_retryable());
}

#[test_case("WEAVIATE", "weaviate" ; "weaviate upper")]
#[test_case("Milvus", "milvus" ; "milvus mixed")]
#[test_case("memory", "memory" ; "memory lower")]
fn test_factory_is_case_insensitive(kind: &str, expected: &str) {
    let store = create(kind, &BackendOptions::default());
    assert_eq!(store.identify(), expected);
    assert_eq!(store.connection_state(), ConnectionState::Uninitialized);
}

#[test]
fn test_factory_unknown_kind() {
    let err = BackendFactory::create(Some("chroma"), "RagMeDocs", &unreachable_settings())
        .err()
        .expect("unknown kind");
    match err {
        Error::Configuration(msg) => assert!(msg.contains("chroma")),
        other => panic!("expected configuration error, got {other}"),
    }
}

#[test]
fn test_factory_reads_kind_from_settings() {
    let settings = unreachable_settings().with("VECTOR_DB_TYPE", "MILVUS");
    let store = BackendFactory::create(None, "RagMeDocs", &settings).expect("create");
    assert_eq!(store.identify(), "milvus");
}

#[test]
fn test_identify_selects_same_kind() {
    for kind in ["weaviate", "milvus", "memory"] {
        let first = create(kind, &BackendOptions::default());
        let second = create(first.identify(), &BackendOptions::default());
        assert_eq!(first.identify(), second.identify());
    }
}

#[test_case("weaviate" ; "weaviate")]
#[test_case("milvus" ; "milvus")]
fn test_unreachable_backend_degrades(kind: &str) {
    let (options, sink) = recording();
    let store = create(kind, &options);

    store.setup().expect("setup does not raise");
    assert_eq!(store.connection_state(), ConnectionState::Unavailable);

    store.write(&docs(2, 8)).expect("write does not raise");
    assert!(store.list(10, 0).expect("list does not raise").is_empty());
    let answer = store.create_query_agent().query("page").expect("query does not raise");
    assert_eq!(answer.status, AnswerStatus::ServiceUnavailable);

    assert!(!sink.warnings_for("setup").is_empty());
    assert!(!sink.warnings_for("write").is_empty());
    assert!(!sink.warnings_for("list").is_empty());
    assert!(sink.warnings().iter().all(|w| w.backend == kind));
}

#[test]
fn test_lazy_write_marks_unavailable() {
    let (options, sink) = recording();
    let store = create("weaviate", &options);

    store.write(&docs(1, 8)).expect("write degrades");
    assert_eq!(store.connection_state(), ConnectionState::Unavailable);
    assert_eq!(sink.warnings().len(), 1);
}

#[test_case("weaviate" ; "weaviate")]
#[test_case("milvus" ; "milvus")]
#[test_case("memory" ; "memory")]
fn test_cleanup_twice(kind: &str) {
    let store = create(kind, &BackendOptions::default());
    store.cleanup();
    store.setup().expect("setup");
    store.cleanup();
    store.cleanup();
    assert_eq!(store.connection_state(), ConnectionState::Uninitialized);
}

#[test_case("weaviate" ; "weaviate")]
#[test_case("milvus" ; "milvus")]
#[test_case("memory" ; "memory")]
fn test_validation_reports_position_without_writing(kind: &str) {
    let store = create(kind, &BackendOptions::default());
    let mut batch = docs(5, 8);
    batch[2].locator = String::new();

    match store.write(&batch) {
        Err(Error::Validation { position, .. }) => assert_eq!(position, 3),
        other => panic!("expected validation error, got {other:?}"),
    }
    // Rejected before any connection attempt.
    assert_eq!(store.connection_state(), ConnectionState::Uninitialized);
}

#[test]
fn test_memory_round_trip_and_paging() {
    let store = create("memory", &BackendOptions::default());
    store.setup().expect("setup");
    assert!(store.list(10, 0).expect("list").is_empty());

    store.write(&docs(4, 0)).expect("write");
    let all = store.list(10, 0).expect("list");
    assert_eq!(all.len(), 4);
    assert_eq!(store.list(10, 4).expect("list"), Vec::<Document>::new());
    assert_eq!(store.list(2, 2).expect("list"), all[2..].to_vec());
}

#[test]
fn test_memory_unreachable_recovers_only_via_setup() {
    let (options, sink) = recording();
    let store = InMemoryBackend::unreachable("RagMeDocs", &options);
    store.write(&docs(1, 0)).expect("degrades");
    store.write(&docs(1, 0)).expect("degrades");
    assert_eq!(store.connection_state(), ConnectionState::Unavailable);
    assert_eq!(sink.warnings_for("write").len(), 2);
    assert!(store.is_empty());
}

#[test]
fn test_rag_service_end_to_end() {
    let rag = RagService::from_settings(Some("memory"), &Settings::new()).expect("create");
    rag.setup().expect("setup");
    rag.write_webpages(&[
        (
            "https://www.rust-lang.org".to_string(),
            "Rust is a language empowering everyone to build reliable software".to_string(),
        ),
        (
            "https://weaviate.io".to_string(),
            "Weaviate is an open source vector database".to_string(),
        ),
    ])
    .expect("write");

    let answer = rag.ask("Which vector database is open source?").expect("ask");
    assert_eq!(answer.status, AnswerStatus::Answered);
    assert_eq!(answer.sources[0].locator, "https://weaviate.io");
    assert_eq!(answer.sources[0].metadata["type"], "webpage");

    rag.cleanup();
    rag.cleanup();
}

#[test]
fn test_rag_service_embeds_for_milvus() {
    let (options, sink) = recording();
    let options = options.with_embedder(Arc::new(HashEmbedder::new(8)));
    let rag = RagService::from_settings_with(Some("milvus"), &unreachable_settings(), &options)
        .expect("create");

    rag.write_documents(&[Document::new("https://a", "no vector yet")])
        .expect("embedded then degraded");
    assert_eq!(rag.connection_state(), ConnectionState::Unavailable);
    assert_eq!(sink.warnings_for("write").len(), 1);
}

#[test]
fn test_rag_service_milvus_webpages_use_backend_embedder() {
    let rag = RagService::from_settings(Some("milvus"), &unreachable_settings()).expect("create");

    let result = rag.write_webpages(&[("https://a".to_string(), "body".to_string())]);
    assert!(result.is_ok(), "expected a degraded write, got {result:?}");
    assert_eq!(rag.connection_state(), ConnectionState::Unavailable);
}

#[test]
fn test_milvus_oversized_text_is_rejected() {
    let (options, sink) = recording();
    let store = create("milvus", &options);
    let batch = vec![Document::new("https://a", "x".repeat(70_000)).with_embedding(vec![0.5; 8])];

    match store.write(&batch) {
        Err(Error::Validation { position, reason }) => {
            assert_eq!(position, 1);
            assert!(reason.contains("70000 bytes"));
        },
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(store.connection_state(), ConnectionState::Uninitialized);
    assert!(sink.warnings().is_empty());
}

#[test]
fn test_missing_settings_fail_construction() {
    let err = RagService::from_settings(Some("milvus"), &Settings::new())
        .err()
        .expect("missing uri");
    assert!(matches!(err, Error::Configuration(ref msg) if msg.contains("MILVUS_URI")));
}
