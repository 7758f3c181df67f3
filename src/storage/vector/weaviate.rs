//! Weaviate vector store adapter.
//!
//! Talks to Weaviate's REST and GraphQL API. Documents are stored in a class
//! named after the collection with three text properties; Weaviate computes
//! embeddings itself when the class has a vectorizer module, so callers never
//! need to supply one.
//!
//! # Endpoints Used
//!
//! | Operation | Endpoint | Description |
//! |-----------|----------|-------------|
//! | Connect | `GET /v1/.well-known/ready` | Readiness probe |
//! | Ensure class | `GET /v1/schema/{class}`, `POST /v1/schema` | Creates the class if absent |
//! | Write | `POST /v1/batch/objects` | Batch insert |
//! | List | `GET /v1/objects?class=..&limit=..&offset=..` | Paged listing |
//! | Query | `POST /v1/graphql` | `bm25` or `nearText` retrieval |
//!
//! # Class Schema
//!
//! | Property | Type | Content |
//! |----------|------|---------|
//! | `url` | text | Document locator |
//! | `text` | text | Document body |
//! | `metadata` | text | Metadata serialized as a JSON object |

use crate::config::{Settings, WeaviateConfig, WeaviateQueryMode};
use crate::models::{Document, QueryAnswer};
use crate::storage::lifecycle::Lifecycle;
use crate::storage::traits::{ConnectionState, QueryAgent, VectorStore};
use crate::storage::validation::{DocumentRequirements, validate_batch};
use crate::storage::{BackendOptions, http};
use crate::{Error, Result};
use regex::Regex;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::sync::{Arc, LazyLock};

/// Weaviate class names start with an uppercase letter.
static CLASS_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Z][_0-9A-Za-z]*$").ok());

/// Properties requested from every object.
const PROPERTIES: [&str; 3] = ["url", "text", "metadata"];

/// Weaviate-backed [`VectorStore`].
pub struct WeaviateBackend {
    inner: Arc<Inner>,
}

struct Inner {
    config: WeaviateConfig,
    class: String,
    lifecycle: Lifecycle<Client>,
}

impl WeaviateBackend {
    /// Backend kind.
    pub const KIND: &'static str = "weaviate";

    /// Creates a Weaviate backend. Performs no network I/O.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the collection name is not a valid
    /// Weaviate class name or the API key cannot be sent as a header.
    pub fn new(
        collection_name: impl Into<String>,
        config: WeaviateConfig,
        options: &BackendOptions,
    ) -> Result<Self> {
        let class = collection_name.into();
        let valid = CLASS_NAME.as_ref().is_some_and(|re| re.is_match(&class));
        if !valid {
            return Err(Error::Configuration(format!(
                "invalid Weaviate collection name '{class}': must start with an uppercase \
                 letter followed by letters, digits, or underscores"
            )));
        }
        http::check_bearer(Self::KIND, config.api_key.as_ref())?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                class,
                lifecycle: Lifecycle::new(Self::KIND, options.diagnostics.clone()),
            }),
        })
    }

    /// Creates a Weaviate backend from settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `WEAVIATE_URL` is missing or any
    /// setting is malformed.
    pub fn from_settings(
        collection_name: impl Into<String>,
        settings: &Settings,
        options: &BackendOptions,
    ) -> Result<Self> {
        Self::new(collection_name, WeaviateConfig::from_settings(settings)?, options)
    }
}

impl Inner {
    fn url(&self, path: &str) -> String {
        http::endpoint(&self.config.url, path)
    }

    fn connect(&self) -> Result<Client> {
        let client = http::build_client(
            WeaviateBackend::KIND,
            self.config.timeout,
            self.config.api_key.as_ref(),
        )?;
        http::send_ok(
            WeaviateBackend::KIND,
            "connect",
            client.get(self.url("v1/.well-known/ready")),
        )?;
        self.ensure_class(&client)?;
        Ok(client)
    }

    fn ensure_class(&self, client: &Client) -> Result<()> {
        let (status, _) = http::send(
            WeaviateBackend::KIND,
            "ensure_collection",
            client.get(self.url(&format!("v1/schema/{}", self.class))),
        )?;
        if (200..300).contains(&status) {
            return Ok(());
        }
        if status != 404 {
            return Err(http::unavailable(
                WeaviateBackend::KIND,
                "ensure_collection",
                format!("schema lookup returned HTTP {status}"),
            ));
        }

        let (status, body) = http::send(
            WeaviateBackend::KIND,
            "ensure_collection",
            client
                .post(self.url("v1/schema"))
                .json(&class_schema(&self.class)),
        )?;
        // A concurrent creator may win the race.
        let raced = status == 422 && body.to_string().contains("already exists");
        if (200..300).contains(&status) || raced {
            tracing::info!(class = %self.class, "weaviate class ready");
            return Ok(());
        }
        Err(http::unavailable(
            WeaviateBackend::KIND,
            "ensure_collection",
            format!("class creation returned HTTP {status}: {body}"),
        ))
    }

    fn write(&self, client: &Client, documents: &[Document]) -> Result<()> {
        let body = http::send_ok(
            WeaviateBackend::KIND,
            "write",
            client
                .post(self.url("v1/batch/objects"))
                .json(&batch_payload(&self.class, documents)),
        )?;
        if let Some(errors) = batch_errors(&body) {
            return Err(http::unavailable(WeaviateBackend::KIND, "write", errors));
        }
        tracing::debug!(class = %self.class, count = documents.len(), "weaviate batch written");
        Ok(())
    }

    fn list(&self, client: &Client, limit: usize, offset: usize) -> Result<Vec<Document>> {
        let limit = limit.to_string();
        let offset = offset.to_string();
        let body = http::send_ok(
            WeaviateBackend::KIND,
            "list",
            client.get(self.url("v1/objects")).query(&[
                ("class", self.class.as_str()),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
            ]),
        )?;
        Ok(parse_objects(&body))
    }

    fn search(&self, client: &Client, text: &str, limit: usize) -> Result<Vec<Document>> {
        let query = graphql_query(&self.class, self.config.query_mode, text, limit);
        let body = http::send_ok(
            WeaviateBackend::KIND,
            "query",
            client
                .post(self.url("v1/graphql"))
                .json(&json!({ "query": query })),
        )?;
        parse_graphql(&self.class, &body)
    }
}

impl VectorStore for WeaviateBackend {
    fn identify(&self) -> &'static str {
        Self::KIND
    }

    fn collection_name(&self) -> &str {
        &self.inner.class
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
            |client| self.inner.write(client, documents),
        )
    }

    fn list(&self, limit: usize, offset: usize) -> Result<Vec<Document>> {
        self.inner.lifecycle.run(
            "list",
            || self.inner.connect(),
            Vec::new,
            |client| {
                if limit == 0 {
                    return Ok(Vec::new());
                }
                self.inner.list(client, limit, offset)
            },
        )
    }

    fn create_query_agent_with_limit(&self, limit: usize) -> Box<dyn QueryAgent> {
        Box::new(WeaviateQueryAgent {
            inner: self.inner.clone(),
            limit,
        })
    }

    fn cleanup(&self) {
        self.inner.lifecycle.release();
    }
}

/// Query agent retrieving passages through GraphQL.
struct WeaviateQueryAgent {
    inner: Arc<Inner>,
    limit: usize,
}

impl QueryAgent for WeaviateQueryAgent {
    fn query(&self, text: &str) -> Result<QueryAnswer> {
        self.inner.lifecycle.run(
            "query",
            || self.inner.connect(),
            || QueryAnswer::unavailable(WeaviateBackend::KIND),
            |client| {
                if text.trim().is_empty() || self.limit == 0 {
                    return Ok(QueryAnswer::from_sources(Vec::new()));
                }
                let sources = self.inner.search(client, text, self.limit)?;
                Ok(QueryAnswer::from_sources(sources))
            },
        )
    }
}

fn class_schema(class: &str) -> Value {
    json!({
        "class": class,
        "description": "Documents stored by ragstore",
        "properties": PROPERTIES
            .iter()
            .map(|name| json!({ "name": name, "dataType": ["text"] }))
            .collect::<Vec<_>>(),
    })
}

fn batch_payload(class: &str, documents: &[Document]) -> Value {
    let objects: Vec<Value> = documents
        .iter()
        .map(|doc| {
            let mut object = json!({
                "class": class,
                "properties": {
                    "url": doc.locator,
                    "text": doc.text,
                    "metadata": doc.metadata_json(),
                },
            });
            if let Some(vector) = doc.embedding() {
                object["vector"] = json!(vector);
            }
            object
        })
        .collect();
    json!({ "objects": objects })
}

/// Collects per-object errors from a batch response.
fn batch_errors(body: &Value) -> Option<String> {
    let messages: Vec<String> = body
        .as_array()?
        .iter()
        .filter_map(|item| item.pointer("/result/errors/error")?.as_array())
        .flatten()
        .filter_map(|err| err.get("message").and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    (!messages.is_empty()).then(|| messages.join("; "))
}

fn document_from_properties(properties: &Value) -> Document {
    let field = |name: &str| {
        properties
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
    };
    let mut doc = Document::new(field("url"), field("text"));
    doc.metadata = Document::metadata_from_json(field("metadata"));
    doc
}

fn parse_objects(body: &Value) -> Vec<Document> {
    body.get("objects")
        .and_then(Value::as_array)
        .map(|objects| {
            objects
                .iter()
                .filter_map(|object| object.get("properties"))
                .map(document_from_properties)
                .collect()
        })
        .unwrap_or_default()
}

fn graphql_query(class: &str, mode: WeaviateQueryMode, text: &str, limit: usize) -> String {
    // JSON string escaping is valid GraphQL string escaping.
    let escaped = Value::String(text.to_string()).to_string();
    let operator = match mode {
        WeaviateQueryMode::Bm25 => format!("bm25: {{query: {escaped}}}"),
        WeaviateQueryMode::NearText => format!("nearText: {{concepts: [{escaped}]}}"),
    };
    format!(
        "{{ Get {{ {class}({operator}, limit: {limit}) {{ {} }} }} }}",
        PROPERTIES.join(" ")
    )
}

fn parse_graphql(class: &str, body: &Value) -> Result<Vec<Document>> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str))
            .collect();
        if !messages.is_empty() {
            return Err(http::unavailable(
                WeaviateBackend::KIND,
                "query",
                messages.join("; "),
            ));
        }
    }

    Ok(body
        .pointer(&format!("/data/Get/{class}"))
        .and_then(Value::as_array)
        .map(|hits| hits.iter().map(document_from_properties).collect())
        .unwrap_or_default())
}
