//! Memory engine errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{EmbeddingError, StoreError};
use crate::mode::{Mode, Operation};

/// Error taxonomy surfaced to callers of the memory engine.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Operation '{operation}' is not permitted in {mode} mode")]
    NotPermitted { operation: Operation, mode: Mode },

    #[error("Backend '{backend}' timed out after {timeout_ms}ms during {operation}")]
    BackendTimeout {
        operation: Operation,
        backend: String,
        timeout_ms: u64,
    },

    #[error("Backend '{backend}' failed during {operation}: {source}")]
    Backend {
        operation: Operation,
        backend: String,
        #[source]
        source: StoreError,
    },

    #[error("Embedding provider '{provider}' failed during {operation}: {source}")]
    Embedding {
        operation: Operation,
        provider: String,
        #[source]
        source: EmbeddingError,
    },
}

impl MemoryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::NotFound(_) => ErrorKind::NotFoundError,
            Self::Configuration(_) => ErrorKind::ConfigurationError,
            Self::NotPermitted { .. } => ErrorKind::PermissionError,
            Self::BackendTimeout { .. } => ErrorKind::BackendTimeout,
            Self::Backend { .. } | Self::Embedding { .. } => ErrorKind::BackendError,
        }
    }

    /// Whether a caller may reasonably retry. The engine itself never does.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::BackendTimeout { .. } => true,
            Self::Backend { source, .. } => source.is_connection(),
            Self::Embedding { source, .. } => matches!(source, EmbeddingError::Failed(_)),
            _ => false,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    NotFoundError,
    ConfigurationError,
    PermissionError,
    BackendTimeout,
    BackendError,
    MaintenanceWarning,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::NotFoundError => "not_found_error",
            Self::ConfigurationError => "configuration_error",
            Self::PermissionError => "permission_error",
            Self::BackendTimeout => "backend_timeout",
            Self::BackendError => "backend_error",
            Self::MaintenanceWarning => "maintenance_warning",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable `{kind, message}` pair handed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&MemoryError> for ErrorReport {
    fn from(err: &MemoryError) -> Self {
        err.report()
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
