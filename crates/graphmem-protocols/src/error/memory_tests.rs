use super::*;
use crate::graph::QueryDialect;

#[test]
fn test_validation_error() {
    let err = MemoryError::validation("entity name must not be empty");
    assert_eq!(err.kind(), ErrorKind::ValidationError);
    assert!(err.to_string().contains("Validation error"));
    assert!(!err.is_retryable());
}

#[test]
fn test_not_found_error() {
    let err = MemoryError::not_found("entity 'Ada'");
    assert_eq!(err.kind(), ErrorKind::NotFoundError);
    assert!(err.to_string().contains("Ada"));
}

#[test]
fn test_not_permitted_display() {
    let err = MemoryError::NotPermitted {
        operation: Operation::RunQuery,
        mode: Mode::Write,
    };
    assert_eq!(err.kind(), ErrorKind::PermissionError);
    assert_eq!(
        err.to_string(),
        "Operation 'run_query' is not permitted in write mode"
    );
}

#[test]
fn test_timeout_carries_context() {
    let err = MemoryError::BackendTimeout {
        operation: Operation::GetEntity,
        backend: "neptune".to_string(),
        timeout_ms: 5000,
    };
    let display = err.to_string();
    assert!(display.contains("neptune"));
    assert!(display.contains("get_entity"));
    assert!(display.contains("5000ms"));
    assert!(err.is_retryable());
}

#[test]
fn test_backend_error_keeps_source() {
    let err = MemoryError::Backend {
        operation: Operation::RunQuery,
        backend: "sqlite".to_string(),
        source: StoreError::query(QueryDialect::Sql, "SELEC 1", "syntax error"),
    };
    assert_eq!(err.kind(), ErrorKind::BackendError);
    assert!(err.to_string().contains("SELEC 1"));
    assert!(std::error::Error::source(&err).is_some());
    assert!(!err.is_retryable());
}

#[test]
fn test_connection_failures_are_retryable() {
    let err = MemoryError::Backend {
        operation: Operation::Status,
        backend: "neptune".to_string(),
        source: StoreError::Connection("refused".into()),
    };
    assert!(err.is_retryable());
}

#[test]
fn test_embedding_failure_is_backend_kind() {
    let err = MemoryError::Embedding {
        operation: Operation::SearchEntities,
        provider: "openai".to_string(),
        source: EmbeddingError::Failed("API error 503".into()),
    };
    assert_eq!(err.kind(), ErrorKind::BackendError);
    assert!(err.to_string().contains("openai"));
    assert!(err.is_retryable());
}

#[test]
fn test_report_serialization() {
    let report = MemoryError::configuration("no embedding provider configured").report();
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["kind"], "configuration_error");
    assert!(value["message"].as_str().unwrap().contains("embedding"));
}

#[test]
fn test_kind_strings_match_serde() {
    for kind in [
        ErrorKind::ValidationError,
        ErrorKind::NotFoundError,
        ErrorKind::BackendTimeout,
        ErrorKind::MaintenanceWarning,
    ] {
        let json = serde_json::to_value(kind).unwrap();
        assert_eq!(json, kind.as_str());
    }
}
