//! HTTP client for the Neptune query endpoints.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use graphmem_protocols::error::StoreError;
use graphmem_protocols::{Metadata, QueryDialect};

use crate::graphson::unwrap_graphson;

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Connection settings for a Neptune-compatible endpoint.
#[derive(Debug, Clone)]
pub struct NeptuneStoreConfig {
    /// `host:port`, or a full base URL including the scheme.
    pub endpoint: String,
    pub use_https: bool,
    pub auth_token: Option<String>,
    pub request_timeout: Duration,
}

impl NeptuneStoreConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            use_https: true,
            auth_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_https(mut self, use_https: bool) -> Self {
        self.use_https = use_https;
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            let scheme = if self.use_https { "https" } else { "http" };
            format!("{}://{}", scheme, endpoint)
        }
    }
}

#[derive(Debug, Deserialize)]
struct CypherResponse {
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct GremlinRequest<'a> {
    gremlin: &'a str,
    #[serde(skip_serializing_if = "no_bindings")]
    bindings: &'a Metadata,
}

fn no_bindings(bindings: &&Metadata) -> bool {
    bindings.is_empty()
}

#[derive(Debug, Deserialize)]
struct GremlinResponse {
    result: GremlinResult,
}

#[derive(Debug, Deserialize)]
struct GremlinResult {
    #[serde(default)]
    data: Value,
}

/// Thin wrapper over the openCypher, Gremlin and status endpoints.
pub struct NeptuneClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
    request_timeout: Duration,
}

impl NeptuneClient {
    pub fn new(config: &NeptuneStoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StoreError::Connection(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            auth_token: config.auth_token.clone(),
            request_timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// A deadline expiry is reported separately so the engine can surface it
    /// as a backend timeout.
    fn transport_error(&self, err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout {
                timeout_ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            StoreError::Connection(format!("Request failed: {}", err))
        }
    }

    /// Run one openCypher statement and return its result rows.
    pub async fn cypher(&self, query: &str, params: &Value) -> Result<Vec<Value>, StoreError> {
        let parameters = serde_json::to_string(params)?;
        let url = format!("{}/openCypher", self.base_url);
        debug!(url = %url, "Sending openCypher request");

        let response = self
            .authorize(self.client.post(&url))
            .form(&[("query", query), ("parameters", parameters.as_str())])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let body = check_status(response, QueryDialect::OpenCypher, query).await?;
        let parsed: CypherResponse = serde_json::from_str(&body)?;
        Ok(parsed.results)
    }

    /// Run one Gremlin traversal and return its unwrapped result data.
    pub async fn gremlin(&self, query: &str, bindings: &Metadata) -> Result<Value, StoreError> {
        let url = format!("{}/gremlin", self.base_url);
        debug!(url = %url, "Sending Gremlin request");

        let response = self
            .authorize(self.client.post(&url))
            .json(&GremlinRequest {
                gremlin: query,
                bindings,
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let body = check_status(response, QueryDialect::Gremlin, query).await?;
        let parsed: GremlinResponse = serde_json::from_str(&body)?;
        Ok(unwrap_graphson(parsed.result.data))
    }

    /// Fetch the engine status document.
    pub async fn health(&self) -> Result<Value, StoreError> {
        let url = format!("{}/status", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(StoreError::Connection(format!(
                "Status endpoint returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

async fn check_status(
    response: reqwest::Response,
    dialect: QueryDialect,
    query: &str,
) -> Result<String, StoreError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| StoreError::Connection(format!("Failed to read response: {}", e)))?;

    if status.is_success() {
        return Ok(body);
    }

    if status.is_server_error() && body.is_empty() {
        return Err(StoreError::Connection(format!("Server error {}", status)));
    }

    Err(StoreError::query(dialect, query, error_message(status, &body)))
}

/// Neptune reports failures as `{"code": ..., "detailedMessage": ...}`.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let detail = parsed.as_ref().and_then(|v| {
        v.get("detailedMessage")
            .or_else(|| v.get("message"))
            .and_then(Value::as_str)
    });
    let code = parsed
        .as_ref()
        .and_then(|v| v.get("code"))
        .and_then(Value::as_str);

    match (code, detail) {
        (Some(code), Some(detail)) => format!("{} ({}): {}", code, status.as_u16(), detail),
        (None, Some(detail)) => format!("{}: {}", status.as_u16(), detail),
        _ => format!("{}: {}", status.as_u16(), body),
    }
}
