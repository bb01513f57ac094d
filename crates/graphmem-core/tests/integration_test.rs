//! End-to-end tests against a file-backed SQLite store.
//!
//! These go through the public engine API only: writes, maintenance,
//! reads and a reopen of the same database file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use serde_json::json;

use graphmem_core::{EngineConfig, MemoryEngine};
use graphmem_embedding::HashEmbedding;
use graphmem_protocols::{
    CONTAINS_SUBGRAPH, Direction, ErrorKind, Metadata, Relation, SUBGRAPH_TYPE, SearchMode,
};
use graphmem_store_neptune::{NeptuneGraphStore, NeptuneStoreConfig};
use graphmem_store_sqlite::SqliteGraphStore;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

// ============================================================================
// Helpers
// ============================================================================

async fn open_engine(path: &Path, config: EngineConfig) -> MemoryEngine {
    let store = SqliteGraphStore::open(path).await.unwrap();
    MemoryEngine::new(Arc::new(store), config).with_embedder(Arc::new(HashEmbedding::new(128)))
}

async fn outgoing(engine: &MemoryEngine, name: &str) -> Vec<Relation> {
    engine
        .list_relations(name, Direction::Outgoing)
        .unwrap()
        .try_collect()
        .await
        .unwrap()
}

fn standups(days: std::ops::RangeInclusive<u32>) -> Vec<String> {
    days.map(|day| format!("2024-01-{:02} 09:00 | standup {}", day, day))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_memory_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.db");

    let engine = open_engine(&path, EngineConfig::default()).await;
    let mut metadata = Metadata::new();
    metadata.insert("role".to_string(), json!("mathematician"));
    engine
        .create_or_merge_entity("Ada", "Person", metadata, &standups(1..=10))
        .await
        .unwrap();
    engine
        .create_or_merge_entity("Ada", "Person", Metadata::new(), &standups(11..=16))
        .await
        .unwrap();
    engine
        .create_or_merge_relation("Ada", "Analytical Engine", "WORKED_ON", Metadata::new())
        .await
        .unwrap();
    engine.close().await.unwrap();
    drop(engine);

    let engine = open_engine(&path, EngineConfig::default()).await;
    let ada = engine.get_entity("Ada").await.unwrap();
    assert_eq!(ada.observations.len(), 15);
    assert_eq!(ada.observations[0], "2024-01-16 09:00 | standup 16");
    assert!(!ada.observations.contains(&"2024-01-01 09:00 | standup 1".to_string()));
    assert_eq!(ada.last_observation_update.as_deref(), Some("2024-01-16 09:00:00"));
    assert_eq!(ada.metadata["role"], json!("mathematician"));

    let relations = outgoing(&engine, "Ada").await;
    assert_eq!(relations.len(), 1);
    assert_eq!(relations[0].target, "Analytical Engine");

    let exact = engine
        .search_entities("ada", None, SearchMode::Exact)
        .await
        .unwrap();
    assert_eq!(exact.len(), 1);

    let semantic = engine
        .search_entities("mathematician", Some(5), SearchMode::Semantic)
        .await
        .unwrap();
    assert!(!semantic.is_empty());
    assert!(semantic.iter().all(|r| (0.0..=1.0).contains(&r.score)));
}

#[tokio::test]
async fn test_hub_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hub.db");
    let config = EngineConfig::default().with_subgraph_limits(3, 2);
    let engine = open_engine(&path, config).await;

    for i in 1..=4 {
        let outcome = engine
            .create_or_merge_relation("Hub", &format!("T{}", i), "LINKS", Metadata::new())
            .await
            .unwrap();
        assert!(outcome.is_clean());
    }

    let hub_edges = outgoing(&engine, "Hub").await;
    assert_eq!(hub_edges.len(), 2);
    assert!(hub_edges.iter().all(|r| r.relation_type == CONTAINS_SUBGRAPH));

    let mut moved = 0;
    for edge in &hub_edges {
        let subgraph = engine.get_entity(&edge.target).await.unwrap();
        assert_eq!(subgraph.entity_type, SUBGRAPH_TYPE);
        moved += outgoing(&engine, &edge.target).await.len();
    }
    assert_eq!(moved, 4);

    let neighborhood = engine
        .read_neighborhood(&["Hub".to_string()], 2)
        .await
        .unwrap();
    assert_eq!(neighborhood.entities.len(), 7);

    engine.delete_relation("Hub", "T1", "LINKS").await.unwrap();
    let err = engine.delete_relation("Hub", "T1", "LINKS").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFoundError);

    let subgraphs: Vec<String> = hub_edges.into_iter().map(|r| r.target).collect();
    engine.delete_entity("Hub").await.unwrap();
    for name in subgraphs {
        let err = engine.get_entity(&name).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFoundError);
    }
    assert!(engine.get_entity("T2").await.is_ok());
}

#[tokio::test]
async fn test_slow_remote_backend_reports_timeout() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "results": [] }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let store = NeptuneGraphStore::new(
        NeptuneStoreConfig::new(server.uri()).with_request_timeout(Duration::from_millis(300)),
    )
    .unwrap();
    let engine = MemoryEngine::new(
        Arc::new(store),
        EngineConfig::default().with_timeout(Duration::from_secs(5)),
    );

    let err = engine.get_entity("Ada").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendTimeout);
    assert!(err.is_retryable());
}
