//! CLI command implementations.
//!
//! Each command takes a [`RagService`] and returns the text to print, so the
//! binary only parses arguments and writes output.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `setup` | Connect and ensure the collection exists |
//! | `write` | Write documents from a JSON file |
//! | `webpage` | Write one web page from a text file |
//! | `list` | Print stored documents as JSON |
//! | `query` | Answer a question from stored documents |
//! | `status` | Probe the backend and show its connection state |
//!
//! # Example Usage
//!
//! ```bash
//! ragstore --backend milvus setup
//! ragstore write docs.json
//! ragstore webpage https://example.com --text-file page.txt
//! ragstore list --limit 5
//! ragstore query "What is example.com?" --limit 3
//! ```

mod input;

pub use input::{read_documents, read_text};

use crate::models::AnswerStatus;
use crate::services::RagService;
use crate::storage::ConnectionState;
use crate::{Error, Result};
use std::fmt::Write as _;
use std::path::Path;

/// Default page size for `list`.
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// Connects and ensures the collection exists.
///
/// # Errors
///
/// Returns an error for configuration problems.
pub fn setup(rag: &RagService) -> Result<String> {
    rag.setup()?;
    Ok(describe_state(rag, "ready"))
}

/// Writes the documents stored in a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the batch is invalid.
pub fn write(rag: &RagService, path: &Path) -> Result<String> {
    let documents = read_documents(path)?;
    rag.write_documents(&documents)?;
    Ok(describe_state(
        rag,
        &format!("wrote {} document(s)", documents.len()),
    ))
}

/// Writes one web page whose text is read from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the URL is blank.
pub fn webpage(rag: &RagService, url: &str, text_file: &Path) -> Result<String> {
    let text = read_text(text_file)?;
    rag.write_webpages(&[(url.to_string(), text)])?;
    Ok(describe_state(rag, &format!("wrote web page {url}")))
}

/// Lists documents as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the documents cannot be serialized.
pub fn list(rag: &RagService, limit: usize, offset: usize) -> Result<String> {
    let documents = rag.list_documents(limit, offset)?;
    serde_json::to_string_pretty(&documents).map_err(|e| Error::OperationFailed {
        operation: "render_documents".to_string(),
        cause: e.to_string(),
    })
}

/// Answers a question, listing the sources used.
///
/// `limit` caps the documents drawn on; `None` uses the backend default.
///
/// # Errors
///
/// Returns an error for failures outside the backend.
pub fn query(rag: &RagService, question: &str, limit: Option<usize>) -> Result<String> {
    let answer = match limit {
        Some(limit) => rag.ask_with_limit(question, limit)?,
        None => rag.ask(question)?,
    };
    let mut out = answer.answer.clone();
    if answer.status == AnswerStatus::Answered {
        out.push_str("\n\nSources:");
        for source in &answer.sources {
            let _ = write!(out, "\n- {}", source.locator);
        }
    }
    Ok(out)
}

/// Probes the backend and shows its kind, collection, and connection state.
///
/// # Errors
///
/// Returns an error for configuration problems.
pub fn status(rag: &RagService) -> Result<String> {
    rag.setup()?;
    let store = rag.store();
    Ok(format!(
        "backend:    {}\ncollection: {}\nstate:      {}",
        store.identify(),
        store.collection_name(),
        store.connection_state()
    ))
}

/// Runs one command, then releases the backend client whether or not the
/// command succeeded.
///
/// # Errors
///
/// Returns the command's error.
pub fn with_cleanup<T>(rag: &RagService, command: impl FnOnce(&RagService) -> Result<T>) -> Result<T> {
    let result = command(rag);
    rag.cleanup();
    result
}

fn describe_state(rag: &RagService, done: &str) -> String {
    let store = rag.store();
    match store.connection_state() {
        ConnectionState::Unavailable => format!(
            "{} is unavailable; nothing was done (see warnings)",
            store.identify()
        ),
        _ => format!("{}/{}: {done}", store.identify(), store.collection_name()),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::storage::{BackendOptions, InMemoryBackend};
    use std::io::Write;

    fn rag() -> RagService {
        RagService::new(Box::new(InMemoryBackend::new("RagMeDocs", &BackendOptions::default())))
    }

    #[test]
    fn test_write_then_list_json() {
        let mut file = tempfile::NamedTempFile::new().expect("temp");
        file.write_all(br#"[{"url": "https://a", "text": "alpha"}]"#)
            .expect("write");

        let rag = rag();
        let out = write(&rag, file.path()).expect("write");
        assert_eq!(out, "memory/RagMeDocs: wrote 1 document(s)");

        let listed: serde_json::Value =
            serde_json::from_str(&list(&rag, DEFAULT_LIST_LIMIT, 0).expect("list")).expect("json");
        assert_eq!(listed[0]["url"], "https://a");
    }

    #[test]
    fn test_webpage_and_query() {
        let mut file = tempfile::NamedTempFile::new().expect("temp");
        file.write_all(b"Example Domain is for illustrative examples")
            .expect("write");

        let rag = rag();
        webpage(&rag, "https://example.com", file.path()).expect("webpage");
        let out = query(&rag, "illustrative examples", None).expect("query");
        assert!(out.contains("Example Domain"));
        assert!(out.ends_with("- https://example.com"));
    }

    #[test]
    fn test_failed_command_still_cleans_up() {
        let rag = rag();
        let missing = std::path::PathBuf::from("/nonexistent/ragstore/docs.json");
        let result = with_cleanup(&rag, |rag| {
            setup(rag)?;
            assert_eq!(rag.connection_state(), ConnectionState::Connected);
            write(rag, &missing)
        });

        assert!(result.is_err());
        assert_eq!(rag.connection_state(), ConnectionState::Uninitialized);
    }

    #[test]
    fn test_unavailable_is_reported() {
        let rag = RagService::new(Box::new(InMemoryBackend::unreachable(
            "RagMeDocs",
            &BackendOptions::default(),
        )));
        assert_eq!(setup(&rag).expect("setup"), "memory is unavailable; nothing was done (see warnings)");
        assert!(status(&rag).expect("status").contains("state:      unavailable"));
        assert!(query(&rag, "anything", Some(1)).expect("query").starts_with("Service unavailable"));
    }
}
