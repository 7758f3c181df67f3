//! Reading command input files.

use crate::models::Document;
use crate::{Error, Result};
use std::path::Path;

/// Reads a JSON array of documents in the exchange format.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the file cannot be read or is not a
/// JSON array of document mappings.
pub fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let raw = read_text(path)?;
    serde_json::from_str(&raw).map_err(|e| Error::OperationFailed {
        operation: "read_documents".to_string(),
        cause: format!("{}: {e}", path.display()),
    })
}

/// Reads a UTF-8 text file.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the file cannot be read.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
        operation: "read_file".to_string(),
        cause: format!("{}: {e}", path.display()),
    })
}
