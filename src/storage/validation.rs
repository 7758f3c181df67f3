//! Write-path document validation.

use crate::models::Document;
use crate::{Error, Result};

/// Field requirements a backend imposes on written documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentRequirements {
    /// Each document must carry a non-empty embedding.
    pub requires_embedding: bool,
    /// Required embedding length, when the collection has a fixed dimension.
    pub dimension: Option<usize>,
    /// Largest accepted `locator`, in UTF-8 bytes.
    pub max_locator_bytes: Option<usize>,
    /// Largest accepted `text`, in UTF-8 bytes.
    pub max_text_bytes: Option<usize>,
}

impl DocumentRequirements {
    /// Requirements for backends that embed internally (or not at all).
    #[must_use]
    pub const fn none() -> Self {
        Self {
            requires_embedding: false,
            dimension: None,
            max_locator_bytes: None,
            max_text_bytes: None,
        }
    }

    /// Requirements for backends that need caller-provided embeddings.
    #[must_use]
    pub const fn embedding(dimension: usize) -> Self {
        Self {
            requires_embedding: true,
            dimension: Some(dimension),
            max_locator_bytes: None,
            max_text_bytes: None,
        }
    }

    /// Caps `locator` and `text` at the given byte lengths.
    #[must_use]
    pub const fn with_byte_limits(mut self, locator_bytes: usize, text_bytes: usize) -> Self {
        self.max_locator_bytes = Some(locator_bytes);
        self.max_text_bytes = Some(text_bytes);
        self
    }
}

/// Validates a batch before anything is sent to a backend.
///
/// Checks, per record: `locator` is non-blank; `locator` and `text` fit the
/// byte limits, if any; when required, an embedding is present, of the
/// expected length, and finite. Fails on the first
/// offending record with its 1-based position, so nothing from the batch is
/// written.
///
/// # Errors
///
/// Returns [`Error::Validation`] for the first invalid record.
pub fn validate_batch(documents: &[Document], requirements: DocumentRequirements) -> Result<()> {
    for (index, document) in documents.iter().enumerate() {
        validate_document(document, requirements).map_err(|reason| Error::Validation {
            position: index + 1,
            reason,
        })?;
    }
    Ok(())
}

fn validate_document(
    document: &Document,
    requirements: DocumentRequirements,
) -> std::result::Result<(), String> {
    if document.locator.trim().is_empty() {
        return Err("locator (url) is missing or empty".to_string());
    }
    check_length("locator (url)", &document.locator, requirements.max_locator_bytes)?;
    check_length("text", &document.text, requirements.max_text_bytes)?;

    if !requirements.requires_embedding {
        return Ok(());
    }

    let Some(embedding) = document.embedding() else {
        return Err(format!(
            "embedding (vector) is required by this backend but missing for '{}'",
            document.locator
        ));
    };

    if let Some(expected) = requirements.dimension {
        if embedding.len() != expected {
            return Err(format!(
                "embedding dimension mismatch for '{}': expected {expected}, got {}",
                document.locator,
                embedding.len()
            ));
        }
    }

    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(format!(
            "embedding for '{}' contains non-finite values",
            document.locator
        ));
    }

    Ok(())
}

fn check_length(field: &str, value: &str, limit: Option<usize>) -> std::result::Result<(), String> {
    match limit {
        Some(limit) if value.len() > limit => Err(format!(
            "{field} is {} bytes, over the {limit}-byte limit",
            value.len()
        )),
        _ => Ok(()),
    }
}
