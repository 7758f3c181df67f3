//! Blocking HTTP plumbing shared by the REST-based adapters.

use crate::{Error, Result};
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;

/// Maximum number of response body bytes echoed into error messages.
const MAX_ERROR_BODY: usize = 512;

/// Checks that a credential can be sent as a header value.
pub fn check_bearer(backend: &str, bearer: Option<&SecretString>) -> Result<()> {
    bearer.map_or(Ok(()), |token| bearer_header(backend, token).map(|_| ()))
}

fn bearer_header(backend: &str, token: &SecretString) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .map_err(|e| {
            Error::Configuration(format!("{backend} credential is not a valid header: {e}"))
        })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Builds a client with a request timeout and optional bearer token.
///
/// Building a client performs no network I/O.
pub fn build_client(
    backend: &str,
    timeout: Duration,
    bearer: Option<&SecretString>,
) -> Result<Client> {
    let mut headers = HeaderMap::new();
    if let Some(token) = bearer {
        headers.insert(AUTHORIZATION, bearer_header(backend, token)?);
    }

    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| unavailable(backend, "build_client", e))
}

/// Joins a base URL and an API path, tolerating trailing slashes.
pub fn endpoint(base: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Builds a [`Error::BackendUnavailable`].
pub fn unavailable(backend: &str, operation: &str, cause: impl std::fmt::Display) -> Error {
    Error::BackendUnavailable {
        backend: backend.to_string(),
        operation: operation.to_string(),
        cause: cause.to_string(),
    }
}

/// Sends a request and returns the HTTP status with the parsed JSON body.
///
/// Non-JSON and empty bodies parse as `Value::Null`.
pub fn send(backend: &str, operation: &str, request: RequestBuilder) -> Result<(u16, Value)> {
    let response = request
        .send()
        .map_err(|e| unavailable(backend, operation, e))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .map_err(|e| unavailable(backend, operation, e))?;
    let value = serde_json::from_str(&body).unwrap_or(Value::Null);
    Ok((status, value))
}

/// Sends a request and fails unless the status is 2xx.
pub fn send_ok(backend: &str, operation: &str, request: RequestBuilder) -> Result<Value> {
    let (status, value) = send(backend, operation, request)?;
    if (200..300).contains(&status) {
        return Ok(value);
    }
    Err(unavailable(
        backend,
        operation,
        format!("HTTP {status}: {}", truncate_body(&value)),
    ))
}

fn truncate_body(value: &Value) -> String {
    let mut text = value.to_string();
    if text.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}
