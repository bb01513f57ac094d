//! Backend adapter errors.

use thiserror::Error;

use crate::graph::QueryDialect;

const MAX_QUERY_CONTEXT: usize = 240;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    /// The adapter's own transport deadline expired.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("{dialect} query failed: {message} [query: {query}]")]
    Query {
        dialect: QueryDialect,
        query: String,
        message: String,
    },

    #[error("Query dialect '{0}' is not supported by this backend")]
    UnsupportedDialect(QueryDialect),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Relation endpoint does not exist: {0}")]
    MissingEndpoint(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl StoreError {
    /// Query failure carrying the dialect and a bounded excerpt of the query text.
    pub fn query(
        dialect: QueryDialect,
        query: impl AsRef<str>,
        message: impl std::fmt::Display,
    ) -> Self {
        let query = query.as_ref().split_whitespace().collect::<Vec<_>>().join(" ");
        let query = match query.char_indices().nth(MAX_QUERY_CONTEXT) {
            Some((idx, _)) => format!("{}...", &query[..idx]),
            None => query,
        };
        Self::Query {
            dialect,
            query,
            message: message.to_string(),
        }
    }

    /// Whether the failure is transport-level rather than a rejected request.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
