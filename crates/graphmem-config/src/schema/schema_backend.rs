//! Backend selection and connection parameters.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::default_true;

/// Backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// "sqlite" or "neptune".
    #[serde(default = "default_backend_kind")]
    pub kind: String,

    #[serde(default)]
    pub sqlite: SqliteConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neptune: Option<NeptuneConfig>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            sqlite: SqliteConfig::default(),
            neptune: None,
        }
    }
}

fn default_backend_kind() -> String {
    "sqlite".to_string()
}

/// Embedded SQLite store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file. An in-memory database is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Neptune-compatible HTTP endpoint (openCypher and Gremlin).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeptuneConfig {
    /// `host:port`, without scheme.
    pub endpoint: String,

    #[serde(default = "default_true")]
    pub use_https: bool,

    /// Bearer token sent with every request, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// HTTP client timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl NeptuneConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            use_https: true,
            auth_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}
