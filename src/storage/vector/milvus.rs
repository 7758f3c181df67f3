//! Milvus vector store adapter.
//!
//! Uses the Milvus REST API (v2), which Zilliz Cloud exposes as well. Milvus
//! does not embed text, so every written document must carry a vector whose
//! length matches the collection dimension; queries are embedded with the
//! configured [`Embedder`].
//!
//! # Endpoints Used
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | Connect / ensure | `POST /v2/vectordb/collections/has`, `.../collections/create` |
//! | Write | `POST /v2/vectordb/entities/insert` |
//! | List | `POST /v2/vectordb/entities/query` |
//! | Query | `POST /v2/vectordb/entities/search` |
//!
//! Every response carries a `code` field; anything other than `0` is a
//! failed call even when the HTTP status is 200.
//!
//! # Collection Schema
//!
//! | Field | Type |
//! |-------|------|
//! | `id` | `Int64`, primary key, auto id |
//! | `vector` | `FloatVector(dimension)`, COSINE `AUTOINDEX` |
//! | `url` | `VarChar(2048)` |
//! | `text` | `VarChar(65535)` |
//! | `metadata` | `JSON` |

use crate::config::{MilvusConfig, Settings};
use crate::embedding::{Embedder, HashEmbedder};
use crate::models::{Document, Metadata, QueryAnswer};
use crate::storage::lifecycle::Lifecycle;
use crate::storage::traits::{ConnectionState, QueryAgent, VectorStore};
use crate::storage::validation::{DocumentRequirements, validate_batch};
use crate::storage::{BackendOptions, http};
use crate::{Error, Result};
use regex::Regex;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::sync::{Arc, LazyLock};

static COLLECTION_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// Milvus rejects queries whose `offset + limit` exceeds this window.
const MAX_QUERY_WINDOW: usize = 16_384;

/// `VarChar` limits of the `url` and `text` fields; Milvus counts bytes.
const MAX_URL_LENGTH: usize = 2048;
const MAX_TEXT_LENGTH: usize = 65_535;
const OUTPUT_FIELDS: [&str; 3] = ["url", "text", "metadata"];

/// Milvus-backed [`VectorStore`].
pub struct MilvusBackend {
    inner: Arc<Inner>,
}

struct Inner {
    config: MilvusConfig,
    collection: String,
    embedder: Arc<dyn Embedder>,
    lifecycle: Lifecycle<Client>,
}

impl MilvusBackend {
    /// Backend kind.
    pub const KIND: &'static str = "milvus";

    /// Creates a Milvus backend. Performs no network I/O.
    ///
    /// Queries are embedded with `options.embedder`, falling back to a
    /// [`HashEmbedder`] of the collection dimension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the collection name is invalid,
    /// the token cannot be sent as a header, or the embedder's dimension
    /// differs from the collection's.
    pub fn new(
        collection_name: impl Into<String>,
        config: MilvusConfig,
        options: &BackendOptions,
    ) -> Result<Self> {
        let collection = collection_name.into();
        let valid = COLLECTION_NAME
            .as_ref()
            .is_some_and(|re| re.is_match(&collection));
        if !valid {
            return Err(Error::Configuration(format!(
                "invalid Milvus collection name '{collection}': use letters, digits, and \
                 underscores, not starting with a digit"
            )));
        }
        http::check_bearer(Self::KIND, config.token.as_ref())?;

        let embedder: Arc<dyn Embedder> = match &options.embedder {
            Some(embedder) => embedder.clone(),
            None => Arc::new(HashEmbedder::new(config.dimension)),
        };
        if embedder.dimensions() != config.dimension {
            return Err(Error::Configuration(format!(
                "embedder produces {} dimensions but the Milvus collection uses {}",
                embedder.dimensions(),
                config.dimension
            )));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                collection,
                embedder,
                lifecycle: Lifecycle::new(Self::KIND, options.diagnostics.clone()),
            }),
        })
    }

    /// Creates a Milvus backend from settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `MILVUS_URI` is missing or any
    /// setting is malformed.
    pub fn from_settings(
        collection_name: impl Into<String>,
        settings: &Settings,
        options: &BackendOptions,
    ) -> Result<Self> {
        Self::new(collection_name, MilvusConfig::from_settings(settings)?, options)
    }

    /// Dimension of the collection's vector field.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.inner.config.dimension
    }
}

impl Inner {
    fn call(&self, client: &Client, operation: &str, path: &str, body: &Value) -> Result<Value> {
        let url = http::endpoint(&self.config.uri, &format!("v2/vectordb/{path}"));
        let response = http::send_ok(MilvusBackend::KIND, operation, client.post(url).json(body))?;
        check_code(operation, response)
    }

    fn connect(&self) -> Result<Client> {
        let client = http::build_client(
            MilvusBackend::KIND,
            self.config.timeout,
            self.config.token.as_ref(),
        )?;
        self.ensure_collection(&client)?;
        Ok(client)
    }

    fn ensure_collection(&self, client: &Client) -> Result<()> {
        let response = self.call(
            client,
            "connect",
            "collections/has",
            &json!({ "collectionName": self.collection }),
        )?;
        let exists = response
            .pointer("/data/has")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if exists {
            return Ok(());
        }

        self.call(
            client,
            "ensure_collection",
            "collections/create",
            &create_payload(&self.collection, self.config.dimension),
        )?;
        tracing::info!(
            collection = %self.collection,
            dimension = self.config.dimension,
            "milvus collection created"
        );
        Ok(())
    }

    fn write(&self, client: &Client, documents: &[Document]) -> Result<()> {
        self.call(
            client,
            "write",
            "entities/insert",
            &insert_payload(&self.collection, documents),
        )?;
        tracing::debug!(collection = %self.collection, count = documents.len(), "milvus entities inserted");
        Ok(())
    }

    fn list(&self, client: &Client, limit: usize, offset: usize) -> Result<Vec<Document>> {
        let Some(payload) = query_payload(&self.collection, limit, offset) else {
            return Ok(Vec::new());
        };
        let response = self.call(client, "list", "entities/query", &payload)?;
        Ok(parse_entities(&response))
    }

    fn search(&self, client: &Client, vector: &[f32], limit: usize) -> Result<Vec<Document>> {
        let response = self.call(
            client,
            "query",
            "entities/search",
            &search_payload(&self.collection, vector, limit),
        )?;
        Ok(parse_entities(&response))
    }
}

impl VectorStore for MilvusBackend {
    fn identify(&self) -> &'static str {
        Self::KIND
    }

    fn collection_name(&self) -> &str {
        &self.inner.collection
    }

    fn connection_state(&self) -> ConnectionState {
        self.inner.lifecycle.state()
    }

    fn requires_external_embedding(&self) -> bool {
        true
    }

    fn query_embedder(&self) -> Option<Arc<dyn Embedder>> {
        Some(self.inner.embedder.clone())
    }

    fn setup(&self) -> Result<()> {
        self.inner.lifecycle.setup(|| self.inner.connect())
    }

    fn write(&self, documents: &[Document]) -> Result<()> {
        validate_batch(
            documents,
            DocumentRequirements::embedding(self.inner.config.dimension)
                .with_byte_limits(MAX_URL_LENGTH, MAX_TEXT_LENGTH),
        )?;
        if documents.is_empty() {
            return Ok(());
        }
        self.inner.lifecycle.run(
            "write",
            || self.inner.connect(),
            || (),
            |client| self.inner.write(client, documents),
        )
    }

    fn list(&self, limit: usize, offset: usize) -> Result<Vec<Document>> {
        self.inner.lifecycle.run(
            "list",
            || self.inner.connect(),
            Vec::new,
            |client| self.inner.list(client, limit, offset),
        )
    }

    fn create_query_agent_with_limit(&self, limit: usize) -> Box<dyn QueryAgent> {
        Box::new(MilvusQueryAgent {
            inner: self.inner.clone(),
            limit,
        })
    }

    fn cleanup(&self) {
        self.inner.lifecycle.release();
    }
}

/// Query agent running vector similarity search.
struct MilvusQueryAgent {
    inner: Arc<Inner>,
    limit: usize,
}

impl QueryAgent for MilvusQueryAgent {
    fn query(&self, text: &str) -> Result<QueryAnswer> {
        if text.trim().is_empty() || self.limit == 0 {
            return Ok(QueryAnswer::from_sources(Vec::new()));
        }
        let vector = self.inner.embedder.embed(text)?;

        self.inner.lifecycle.run(
            "query",
            || self.inner.connect(),
            || QueryAnswer::unavailable(MilvusBackend::KIND),
            |client| {
                let sources = self.inner.search(client, &vector, self.limit)?;
                Ok(QueryAnswer::from_sources(sources))
            },
        )
    }
}

/// Fails unless a Milvus response reports `code: 0`.
fn check_code(operation: &str, response: Value) -> Result<Value> {
    match response.get("code").and_then(Value::as_i64) {
        Some(0) => Ok(response),
        code => {
            let message = response
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no message");
            let code = code.map_or_else(|| "missing".to_string(), |c| c.to_string());
            Err(http::unavailable(
                MilvusBackend::KIND,
                operation,
                format!("code {code}: {message}"),
            ))
        },
    }
}

fn create_payload(collection: &str, dimension: usize) -> Value {
    json!({
        "collectionName": collection,
        "schema": {
            "autoId": true,
            "enableDynamicField": true,
            "fields": [
                { "fieldName": "id", "dataType": "Int64", "isPrimary": true },
                {
                    "fieldName": "vector",
                    "dataType": "FloatVector",
                    "elementTypeParams": { "dim": dimension.to_string() }
                },
                {
                    "fieldName": "url",
                    "dataType": "VarChar",
                    "elementTypeParams": { "max_length": MAX_URL_LENGTH }
                },
                {
                    "fieldName": "text",
                    "dataType": "VarChar",
                    "elementTypeParams": { "max_length": MAX_TEXT_LENGTH }
                },
                { "fieldName": "metadata", "dataType": "JSON" }
            ]
        },
        "indexParams": [
            { "fieldName": "vector", "metricType": "COSINE", "indexName": "vector", "indexType": "AUTOINDEX" }
        ]
    })
}

fn insert_payload(collection: &str, documents: &[Document]) -> Value {
    let data: Vec<Value> = documents
        .iter()
        .map(|doc| {
            json!({
                "vector": doc.embedding().unwrap_or_default(),
                "url": doc.locator,
                "text": doc.text,
                "metadata": Value::Object(doc.metadata.clone()),
            })
        })
        .collect();
    json!({ "collectionName": collection, "data": data })
}

/// Builds a paged query, or `None` when the page is empty by construction.
fn query_payload(collection: &str, limit: usize, offset: usize) -> Option<Value> {
    if limit == 0 || offset >= MAX_QUERY_WINDOW {
        return None;
    }
    let limit = limit.min(MAX_QUERY_WINDOW - offset);
    Some(json!({
        "collectionName": collection,
        "filter": "id >= 0",
        "limit": limit,
        "offset": offset,
        "outputFields": OUTPUT_FIELDS,
    }))
}

fn search_payload(collection: &str, vector: &[f32], limit: usize) -> Value {
    json!({
        "collectionName": collection,
        "data": [vector],
        "annsField": "vector",
        "limit": limit.min(MAX_QUERY_WINDOW),
        "outputFields": OUTPUT_FIELDS,
    })
}

fn entity_metadata(value: Option<&Value>) -> Metadata {
    match value {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(raw)) => Document::metadata_from_json(raw),
        _ => Metadata::new(),
    }
}

fn parse_entities(response: &Value) -> Vec<Document> {
    response
        .get("data")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    let field = |name: &str| row.get(name).and_then(Value::as_str).unwrap_or_default();
                    let mut doc = Document::new(field("url"), field("text"));
                    doc.metadata = entity_metadata(row.get("metadata"));
                    doc
                })
                .collect()
        })
        .unwrap_or_default()
}
