//! Typed connection settings for the network backends.
//!
//! Both configs are validated without any network I/O, so an unreachable
//! endpoint never fails construction, while a missing or malformed one does.

use super::{
    MILVUS_DIMENSION, MILVUS_TOKEN, MILVUS_URI, Settings, WEAVIATE_API_KEY, WEAVIATE_QUERY_MODE,
    WEAVIATE_URL,
};
use crate::{Error, Result};
use reqwest::Url;
use secrecy::SecretString;
use std::time::Duration;

/// How the Weaviate query agent retrieves passages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeaviateQueryMode {
    /// Keyword search; works without a vectorizer module.
    #[default]
    Bm25,
    /// Semantic search; requires a vectorizer module on the collection.
    NearText,
}

impl WeaviateQueryMode {
    /// Parses a mode string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bm25" | "keyword" => Some(Self::Bm25),
            "near_text" | "neartext" | "near-text" | "semantic" => Some(Self::NearText),
            _ => None,
        }
    }
}

/// Weaviate connection settings.
#[derive(Debug, Clone)]
pub struct WeaviateConfig {
    /// Base URL of the Weaviate instance.
    pub url: Url,
    /// API key for Weaviate Cloud (sent as a bearer token).
    pub api_key: Option<SecretString>,
    /// Query strategy for the query agent.
    pub query_mode: WeaviateQueryMode,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl WeaviateConfig {
    /// Reads Weaviate settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `WEAVIATE_URL` is missing or invalid,
    /// or if `WEAVIATE_QUERY_MODE` is not a known mode.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let url = required_url(settings, WEAVIATE_URL)?;
        let query_mode = match settings.get(WEAVIATE_QUERY_MODE) {
            None => WeaviateQueryMode::default(),
            Some(raw) => WeaviateQueryMode::parse(raw).ok_or_else(|| {
                Error::Configuration(format!(
                    "invalid value for {WEAVIATE_QUERY_MODE}: '{raw}' (expected bm25 or near_text)"
                ))
            })?,
        };

        Ok(Self {
            url,
            api_key: settings
                .get(WEAVIATE_API_KEY)
                .map(|key| SecretString::from(key.to_string())),
            query_mode,
            timeout: settings.request_timeout()?,
        })
    }
}

/// Milvus connection settings.
#[derive(Debug, Clone)]
pub struct MilvusConfig {
    /// Base URI of the Milvus (or Zilliz Cloud) REST endpoint.
    pub uri: Url,
    /// Access token (`user:password` or API key), sent as a bearer token.
    pub token: Option<SecretString>,
    /// Dimension of the collection's vector field.
    pub dimension: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl MilvusConfig {
    /// Dimension used when `MILVUS_DIMENSION` is unset.
    pub const DEFAULT_DIMENSION: usize = 1536;

    /// Reads Milvus settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `MILVUS_URI` is missing or invalid,
    /// or if `MILVUS_DIMENSION` is not a positive integer.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let uri = required_url(settings, MILVUS_URI)?;
        let dimension = settings
            .parse::<usize>(MILVUS_DIMENSION)?
            .unwrap_or(Self::DEFAULT_DIMENSION);
        if dimension == 0 {
            return Err(Error::Configuration(format!(
                "{MILVUS_DIMENSION} must be greater than zero"
            )));
        }

        Ok(Self {
            uri,
            token: settings
                .get(MILVUS_TOKEN)
                .map(|token| SecretString::from(token.to_string())),
            dimension,
            timeout: settings.request_timeout()?,
        })
    }
}

fn required_url(settings: &Settings, key: &str) -> Result<Url> {
    let raw = settings
        .get(key)
        .ok_or_else(|| Error::Configuration(format!("{key} is not set")))?;
    let url = Url::parse(raw)
        .map_err(|e| Error::Configuration(format!("invalid value for {key}: '{raw}' ({e})")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Configuration(format!(
            "{key} must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(url)
}
