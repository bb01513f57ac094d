use super::*;
use crate::test_support::{BrokenEmbedder, WrappedStore, engine, engine_with, engine_with_embeddings, metadata};
use graphmem_protocols::{ErrorKind, SearchMode};
use serde_json::json;

fn minute(m: u32) -> String {
    format!("2026-01-05 14:{:02} | event {}", m, m)
}

#[tokio::test]
async fn test_create_and_get_entity() {
    let engine = engine().await;
    let outcome = engine
        .create_or_merge_entity(
            "Ada",
            "Person",
            metadata(&[("role", json!("engineer"))]),
            &["2026-01-05 09:00 | Joined Acme".to_string()],
        )
        .await
        .unwrap();
    assert!(outcome.is_clean());
    assert_eq!(outcome.value.entity_type, "Person");

    let fetched = engine.get_entity("Ada").await.unwrap();
    assert_eq!(fetched, outcome.value);
    assert_eq!(fetched.observations, vec!["2026-01-05 09:00 | Joined Acme"]);
    assert_eq!(
        fetched.last_observation_update.as_deref(),
        Some("2026-01-05 09:00:00")
    );
}

#[tokio::test]
async fn test_empty_identifiers_rejected() {
    let engine = engine().await;
    let err = engine
        .create_or_merge_entity("", "Person", Metadata::new(), &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);

    let err = engine
        .create_or_merge_entity("Ada", " ", Metadata::new(), &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[tokio::test]
async fn test_subgraph_type_is_reserved() {
    let engine = engine().await;
    let err = engine
        .create_or_merge_entity("Fake", "SubGraph", Metadata::new(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));
}

#[tokio::test]
async fn test_invalid_observation_writes_nothing() {
    let engine = engine().await;
    let err = engine
        .create_or_merge_entity(
            "Ada",
            "Person",
            Metadata::new(),
            &[
                "2026-01-05 09:00 | fine".to_string(),
                "2026-01-05T09:00:00Z | zoned".to_string(),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));
    assert!(matches!(
        engine.get_entity("Ada").await.unwrap_err(),
        MemoryError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_object_metadata_rejected() {
    let engine = engine().await;
    let err = engine
        .create_or_merge_entity(
            "Ada",
            "Person",
            metadata(&[("address", json!({"city": "London"}))]),
            &[],
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("address"));
}

#[tokio::test]
async fn test_merge_keeps_keys_and_replaces_type() {
    let engine = engine().await;
    engine
        .create_or_merge_entity(
            "Acme Corp",
            "Company",
            metadata(&[("city", json!("Boston")), ("founded", json!(1999))]),
            &[],
        )
        .await
        .unwrap();

    let merged = engine
        .create_or_merge_entity(
            "Acme Corp",
            "Organization",
            metadata(&[("city", json!("Seattle"))]),
            &[],
        )
        .await
        .unwrap()
        .value;
    assert_eq!(merged.entity_type, "Organization");
    assert_eq!(merged.metadata["city"], json!("Seattle"));
    assert_eq!(merged.metadata["founded"], json!(1999));
}

#[tokio::test]
async fn test_acme_sixteen_appends_keep_fifteen_newest_first() {
    let engine = engine().await;
    for m in 0..16 {
        engine
            .create_or_merge_entity("Acme Corp", "Organization", Metadata::new(), &[minute(m)])
            .await
            .unwrap();
    }

    let acme = engine.get_entity("Acme Corp").await.unwrap();
    assert_eq!(acme.observations.len(), 15);
    assert!(!acme.observations.contains(&minute(0)));
    assert_eq!(acme.observations[0], minute(15));
    assert_eq!(acme.observations[14], minute(1));
    assert_eq!(
        acme.last_observation_update.as_deref(),
        Some("2026-01-05 14:15:00")
    );
}

#[tokio::test]
async fn test_historical_entry_at_capacity_is_kept() {
    let engine = engine().await;
    let full: Vec<String> = (1..=15).map(minute).collect();
    engine
        .create_or_merge_entity("Acme Corp", "Organization", Metadata::new(), &full)
        .await
        .unwrap();

    let historical = "2025-06-01 08:00 | Incorporated".to_string();
    let acme = engine
        .create_or_merge_entity(
            "Acme Corp",
            "Organization",
            Metadata::new(),
            std::slice::from_ref(&historical),
        )
        .await
        .unwrap()
        .value;

    assert_eq!(acme.observations.len(), 15);
    assert_eq!(acme.observations[0], historical);
    assert!(!acme.observations.contains(&minute(1)));
    assert_eq!(
        acme.last_observation_update.as_deref(),
        Some("2026-01-05 14:15:00")
    );
}

#[tokio::test]
async fn test_observation_cap_from_config() {
    let mut config = EngineConfig::default();
    config.observation_cap = 3;
    let engine = engine_with(config).await;
    let entries: Vec<String> = (0..5).map(minute).collect();
    let ada = engine
        .create_or_merge_entity("Ada", "Person", Metadata::new(), &entries)
        .await
        .unwrap()
        .value;
    assert_eq!(ada.observations, vec![minute(4), minute(3), minute(2)]);
}

#[tokio::test]
async fn test_delete_entity_cascades_and_reports_missing() {
    let engine = engine().await;
    engine
        .create_or_merge_relation("Ada", "Acme Corp", "WORKS_AT", Metadata::new())
        .await
        .unwrap();

    engine.delete_entity("Acme Corp").await.unwrap();
    let err = engine.get_entity("Acme Corp").await.unwrap_err();
    assert!(matches!(err, MemoryError::NotFound(_)));
    assert!(
        engine
            .all_relations(Operation::ListRelations, "Ada", Direction::Both)
            .await
            .unwrap()
            .is_empty()
    );

    let err = engine.delete_entity("Acme Corp").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFoundError);
}

#[tokio::test]
async fn test_native_schema() {
    let engine = engine().await;
    engine
        .create_or_merge_entity("Ada", "Person", metadata(&[("role", json!("engineer"))]), &[])
        .await
        .unwrap();
    engine
        .create_or_merge_relation(
            "Ada",
            "Acme Corp",
            "WORKS_AT",
            metadata(&[("since", json!(2020))]),
        )
        .await
        .unwrap();

    let schema = engine.get_schema().await.unwrap();
    assert_eq!(schema.entity_types, vec!["Person", "Unknown"]);
    assert_eq!(schema.relation_types, vec!["WORKS_AT"]);
    assert_eq!(schema.entity_property_keys, vec!["role"]);
    assert_eq!(schema.relation_property_keys, vec!["since"]);
}

#[tokio::test]
async fn test_schema_sampled_when_store_cannot_introspect() {
    let store = WrappedStore::new().await.without_introspection();
    let engine = MemoryEngine::new(Arc::new(store), EngineConfig::default());
    engine
        .create_or_merge_entity("Ada", "Person", metadata(&[("role", json!("engineer"))]), &[])
        .await
        .unwrap();
    engine
        .create_or_merge_relation("Ada", "Grace", "KNOWS", metadata(&[("since", json!(1950))]))
        .await
        .unwrap();

    let schema = engine.get_schema().await.unwrap();
    assert_eq!(schema.entity_types, vec!["Person", "Unknown"]);
    assert_eq!(schema.relation_types, vec!["KNOWS"]);
    assert_eq!(schema.entity_property_keys, vec!["role"]);
    assert_eq!(schema.relation_property_keys, vec!["since"]);
}

#[tokio::test]
async fn test_find_entities() {
    let engine = engine().await;
    for (name, city) in [("Grace", "Arlington"), ("Ada", "London"), ("Alan", "London")] {
        engine
            .create_or_merge_entity(name, "Person", metadata(&[("city", json!(city))]), &[])
            .await
            .unwrap();
    }

    let londoners = engine
        .find_entities(&metadata(&[("type", json!("Person")), ("city", json!("London"))]))
        .await
        .unwrap();
    assert_eq!(londoners, vec!["Ada", "Alan"]);

    let err = engine.find_entities(&Metadata::new()).await.unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));
}

#[tokio::test]
async fn test_run_query_requires_full_mode() {
    let engine = engine().await;
    let err = engine
        .run_query(QueryDialect::Sql, "SELECT 1", &Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MemoryError::NotPermitted {
            operation: Operation::RunQuery,
            mode: Mode::Write
        }
    ));
    assert_eq!(err.kind(), ErrorKind::PermissionError);
}

#[tokio::test]
async fn test_run_query_in_full_mode() {
    let engine = engine_with(EngineConfig::default().with_mode(Mode::Full)).await;
    engine
        .create_or_merge_entity("Ada", "Person", Metadata::new(), &[])
        .await
        .unwrap();

    let result = engine
        .run_query(
            QueryDialect::Sql,
            "SELECT name FROM entities WHERE entity_type = :kind",
            &metadata(&[("kind", json!("Person"))]),
        )
        .await
        .unwrap();
    assert_eq!(result.rows, vec![json!({"name": "Ada"})]);

    let err = engine
        .run_query(QueryDialect::Gremlin, "g.V()", &Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));
    assert!(err.to_string().contains("supported: sql"));
}

#[tokio::test]
async fn test_run_query_syntax_error_is_backend_error() {
    let engine = engine_with(EngineConfig::default().with_mode(Mode::Full)).await;
    let err = engine
        .run_query(QueryDialect::Sql, "SELEC name FROM entities", &Metadata::new())
        .await
        .unwrap_err();
    match err {
        MemoryError::Backend {
            operation, backend, ..
        } => {
            assert_eq!(operation, Operation::RunQuery);
            assert_eq!(backend, "sqlite");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_read_mode_blocks_writes_only() {
    let engine = engine_with(EngineConfig::default().with_mode(Mode::Read)).await;
    let err = engine
        .create_or_merge_entity("Ada", "Person", Metadata::new(), &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MemoryError::NotPermitted {
            operation: Operation::CreateEntity,
            mode: Mode::Read
        }
    ));
    assert!(matches!(
        engine.delete_entity("Ada").await.unwrap_err(),
        MemoryError::NotPermitted { .. }
    ));
    assert!(matches!(
        engine.get_entity("Ada").await.unwrap_err(),
        MemoryError::NotFound(_)
    ));
    assert!(engine.get_schema().await.is_ok());
}

#[tokio::test]
async fn test_slow_store_times_out() {
    let store = WrappedStore::new().await.slow(Duration::from_millis(500));
    let engine = MemoryEngine::new(
        Arc::new(store),
        EngineConfig::default().with_timeout(Duration::from_millis(20)),
    );

    let err = engine.get_entity("Ada").await.unwrap_err();
    match &err {
        MemoryError::BackendTimeout {
            operation,
            backend,
            timeout_ms,
        } => {
            assert_eq!(*operation, Operation::GetEntity);
            assert_eq!(backend, "wrapped");
            assert_eq!(*timeout_ms, 20);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(err.is_retryable());

    let status = engine.status().await.unwrap();
    assert_eq!(status.availability, Availability::Unavailable);
    assert!(status.detail.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_status_and_close() {
    let engine = engine().await;
    let status = engine.status().await.unwrap();
    assert_eq!(status.backend, "sqlite");
    assert_eq!(status.availability, Availability::Available);
    assert_eq!(status.dialects, vec![QueryDialect::Sql]);

    engine.close().await.unwrap();
    let status = engine.status().await.unwrap();
    assert_eq!(status.availability, Availability::Unavailable);
}

#[tokio::test]
async fn test_embedding_stored_on_write() {
    let engine = engine_with_embeddings().await;
    let outcome = engine
        .create_or_merge_entity("Ada", "Person", Metadata::new(), &[])
        .await
        .unwrap();
    assert!(outcome.is_clean());

    let stored = engine.store.entity_embeddings().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].0, "Ada");
    assert_eq!(stored[0].1.len(), 256);
}

#[tokio::test]
async fn test_embedding_failure_is_warning() {
    let engine = engine().await.with_embedder(Arc::new(BrokenEmbedder));
    let outcome = engine
        .create_or_merge_entity("Ada", "Person", Metadata::new(), &[])
        .await
        .unwrap();

    assert_eq!(outcome.warnings.len(), 1);
    let warning = &outcome.warnings[0];
    assert_eq!(warning.stage, WarningStage::Embedding);
    assert_eq!(warning.kind, ErrorKind::MaintenanceWarning);
    assert!(warning.message.contains("provider unreachable"));

    assert!(engine.get_entity("Ada").await.is_ok());
    let err = engine
        .search_entities("Ada", Some(5), SearchMode::Semantic)
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::Embedding { .. }));
}
