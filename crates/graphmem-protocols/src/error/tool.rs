//! Tool execution errors.

use thiserror::Error;

use super::{ErrorKind, ErrorReport, MemoryError};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Parameter validation failed: {0}")]
    ValidationFailed(String),

    #[error("Tool already registered: {0}")]
    AlreadyRegistered(String),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl ToolError {
    /// Structured `{kind, message}` form of the error.
    pub fn report(&self) -> ErrorReport {
        match self {
            Self::Memory(err) => err.report(),
            Self::NotFound(_) => ErrorReport {
                kind: ErrorKind::NotFoundError,
                message: self.to_string(),
            },
            Self::InvalidParameters(_) | Self::ValidationFailed(_) => ErrorReport {
                kind: ErrorKind::ValidationError,
                message: self.to_string(),
            },
            Self::AlreadyRegistered(_) => ErrorReport {
                kind: ErrorKind::ConfigurationError,
                message: self.to_string(),
            },
        }
    }
}
