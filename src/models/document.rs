//! Document records exchanged with every backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form document metadata.
pub type Metadata = serde_json::Map<String, Value>;

/// The unit of data written to and read from a backend.
///
/// Serializes to the document exchange format:
///
/// ```json
/// { "url": "https://example.com", "text": "...", "metadata": {}, "vector": [0.1, 0.2] }
/// ```
///
/// `vector` is only emitted when an embedding is present. Uniqueness of
/// `locator` is not enforced here; deduplication is a backend concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Source identifier (URL or other stable id). Must be non-empty to be written.
    #[serde(rename = "url", default)]
    pub locator: String,
    /// Content body. May be empty for non-text assets.
    pub text: String,
    /// Arbitrary metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Embedding, for backends that do not compute embeddings themselves.
    #[serde(rename = "vector", default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    /// Creates a document with empty metadata and no embedding.
    #[must_use]
    pub fn new(locator: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            text: text.into(),
            metadata: Metadata::new(),
            embedding: None,
        }
    }

    /// Creates a document for a fetched web page.
    ///
    /// Metadata is `{"type": "webpage", "url": <url>}`.
    #[must_use]
    pub fn webpage(url: impl Into<String>, text: impl Into<String>) -> Self {
        let url = url.into();
        Self::new(url.clone(), text)
            .with_metadata("type", "webpage")
            .with_metadata("url", url)
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sets the embedding.
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Returns the embedding if present and non-empty.
    #[must_use]
    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref().filter(|v| !v.is_empty())
    }

    /// Serializes the metadata map to a JSON string.
    ///
    /// Weaviate stores metadata as a single text property.
    #[must_use]
    pub fn metadata_json(&self) -> String {
        Value::Object(self.metadata.clone()).to_string()
    }

    /// Parses metadata stored as a JSON string.
    ///
    /// Anything that is not a JSON object is kept under a `raw` key.
    #[must_use]
    pub fn metadata_from_json(raw: &str) -> Metadata {
        if raw.trim().is_empty() {
            return Metadata::new();
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                let mut map = Metadata::new();
                map.insert("raw".to_string(), Value::String(raw.to_string()));
                map
            },
        }
    }
}
