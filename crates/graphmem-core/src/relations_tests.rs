use std::sync::Arc;

use super::*;
use crate::test_support::{WrappedStore, engine, engine_with, metadata};
use crate::EngineConfig;
use futures::{StreamExt, TryStreamExt};
use graphmem_protocols::{
    CONTAINS, CONTAINS_SUBGRAPH, Direction, ErrorKind, GraphStore, ORIGINAL_RELATION_TYPE,
    SUBGRAPH_TYPE, UNKNOWN_TYPE, WarningStage,
};
use serde_json::json;

async fn outgoing(engine: &MemoryEngine, name: &str) -> Vec<Relation> {
    engine
        .list_relations(name, Direction::Outgoing)
        .unwrap()
        .try_collect()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_missing_endpoints_are_created_as_unknown() {
    let engine = engine().await;
    let outcome = engine
        .create_or_merge_relation("Ada", "Acme Corp", "WORKS_AT", Metadata::new())
        .await
        .unwrap();
    assert!(outcome.is_clean());
    assert_eq!(outcome.value.key(), RelationKey::new("Ada", "Acme Corp", "WORKS_AT"));

    for name in ["Ada", "Acme Corp"] {
        let entity = engine.get_entity(name).await.unwrap();
        assert_eq!(entity.entity_type, UNKNOWN_TYPE);
        assert!(entity.observations.is_empty());
    }
}

#[tokio::test]
async fn test_existing_endpoints_keep_their_type() {
    let engine = engine().await;
    engine
        .create_or_merge_entity("Ada", "Person", Metadata::new(), &[])
        .await
        .unwrap();
    engine
        .create_or_merge_relation("Ada", "Acme Corp", "WORKS_AT", Metadata::new())
        .await
        .unwrap();
    assert_eq!(engine.get_entity("Ada").await.unwrap().entity_type, "Person");

    let upgraded = engine
        .create_or_merge_entity("Acme Corp", "Organization", Metadata::new(), &[])
        .await
        .unwrap()
        .value;
    assert_eq!(upgraded.entity_type, "Organization");
}

#[tokio::test]
async fn test_recreating_triple_merges_properties() {
    let engine = engine().await;
    engine
        .create_or_merge_relation(
            "Ada",
            "Acme Corp",
            "WORKS_AT",
            metadata(&[("since", json!(2020)), ("title", json!("engineer"))]),
        )
        .await
        .unwrap();
    let merged = engine
        .create_or_merge_relation(
            "Ada",
            "Acme Corp",
            "WORKS_AT",
            metadata(&[("title", json!("lead"))]),
        )
        .await
        .unwrap()
        .value;

    assert_eq!(merged.properties["since"], json!(2020));
    assert_eq!(merged.properties["title"], json!("lead"));
    assert_eq!(outgoing(&engine, "Ada").await.len(), 1);
}

#[tokio::test]
async fn test_self_relation() {
    let engine = engine().await;
    engine
        .create_or_merge_relation("Ada", "Ada", "REPORTS_TO", Metadata::new())
        .await
        .unwrap();
    assert_eq!(outgoing(&engine, "Ada").await.len(), 1);
}

#[tokio::test]
async fn test_relation_validation() {
    let engine = engine().await;
    let err = engine
        .create_or_merge_relation("", "Acme Corp", "WORKS_AT", Metadata::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);

    let err = engine
        .create_or_merge_relation("Ada", "Acme Corp", CONTAINS, Metadata::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("reserved"));

    let err = engine
        .create_or_merge_relation(
            "Ada",
            "Acme Corp",
            "WORKS_AT",
            metadata(&[("details", json!({"desk": 4}))]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));

    // Nothing was auto-created by the rejected calls.
    assert!(engine.get_entity("Ada").await.is_err());
}

#[tokio::test]
async fn test_ninth_relation_decomposes_hub() {
    let engine = engine().await;
    for i in 1..=8 {
        engine
            .create_or_merge_relation("Acme Corp", &format!("Employee {}", i), "EMPLOYS", Metadata::new())
            .await
            .unwrap();
    }
    assert_eq!(outgoing(&engine, "Acme Corp").await.len(), 8);
    assert!(engine.get_entity("Acme Corp::subgraph::1").await.is_err());

    let outcome = engine
        .create_or_merge_relation(
            "Acme Corp",
            "Employee 9",
            "EMPLOYS",
            metadata(&[("since", json!(2024))]),
        )
        .await
        .unwrap();
    assert!(outcome.is_clean());

    let hub_edges = outgoing(&engine, "Acme Corp").await;
    assert_eq!(hub_edges.len(), 1);
    assert_eq!(hub_edges[0].relation_type, CONTAINS_SUBGRAPH);
    assert_eq!(hub_edges[0].target, "Acme Corp::subgraph::1");

    let subgraph = engine.get_entity("Acme Corp::subgraph::1").await.unwrap();
    assert_eq!(subgraph.entity_type, SUBGRAPH_TYPE);
    assert_eq!(subgraph.metadata["parent_entity"], json!("Acme Corp"));
    assert_eq!(subgraph.metadata["domain"], json!("EMPLOYS"));
    assert_eq!(subgraph.metadata["max_entities"], json!(50));

    let moved = outgoing(&engine, "Acme Corp::subgraph::1").await;
    assert_eq!(moved.len(), 9);
    assert!(moved.iter().all(|r| r.relation_type == CONTAINS));
    assert!(moved.iter().all(|r| r.properties[ORIGINAL_RELATION_TYPE] == json!("EMPLOYS")));
    let nine = moved.iter().find(|r| r.target == "Employee 9").unwrap();
    assert_eq!(nine.properties["since"], json!(2024));
}

#[tokio::test]
async fn test_decomposition_is_idempotent() {
    let engine = engine().await;
    for i in 1..=9 {
        engine
            .create_or_merge_relation("Acme Corp", &format!("Employee {}", i), "EMPLOYS", Metadata::new())
            .await
            .unwrap();
    }
    assert_eq!(engine.decompose("Acme Corp").await.unwrap(), 0);
    assert_eq!(outgoing(&engine, "Acme Corp").await.len(), 1);
    assert_eq!(outgoing(&engine, "Acme Corp::subgraph::1").await.len(), 9);
}

#[tokio::test]
async fn test_recreating_moved_triple_merges_into_contains_edge() {
    let engine = engine().await;
    for i in 1..=9 {
        engine
            .create_or_merge_relation("Acme Corp", &format!("Employee {}", i), "EMPLOYS", Metadata::new())
            .await
            .unwrap();
    }

    let relation = engine
        .create_or_merge_relation(
            "Acme Corp",
            "Employee 3",
            "EMPLOYS",
            metadata(&[("title", json!("manager"))]),
        )
        .await
        .unwrap()
        .value;
    assert_eq!(relation.key(), RelationKey::new("Acme Corp", "Employee 3", "EMPLOYS"));
    assert_eq!(relation.properties["title"], json!("manager"));
    assert!(!relation.properties.contains_key(ORIGINAL_RELATION_TYPE));

    let hub_edges = outgoing(&engine, "Acme Corp").await;
    assert_eq!(hub_edges.len(), 1);
    let contained = engine
        .store
        .fetch_relation(&RelationKey::new("Acme Corp::subgraph::1", "Employee 3", CONTAINS))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(contained.properties["title"], json!("manager"));
}

#[tokio::test]
async fn test_delete_decomposed_relation() {
    let engine = engine().await;
    for i in 1..=9 {
        engine
            .create_or_merge_relation("Acme Corp", &format!("Employee {}", i), "EMPLOYS", Metadata::new())
            .await
            .unwrap();
    }

    engine
        .delete_relation("Acme Corp", "Employee 4", "EMPLOYS")
        .await
        .unwrap();
    assert_eq!(outgoing(&engine, "Acme Corp::subgraph::1").await.len(), 8);

    let err = engine
        .delete_relation("Acme Corp", "Employee 4", "EMPLOYS")
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::NotFound(_)));

    let err = engine
        .delete_relation("Acme Corp", "Employee 5", "FOUNDED")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFoundError);
}

#[tokio::test]
async fn test_delete_direct_relation() {
    let engine = engine().await;
    engine
        .create_or_merge_relation("Ada", "Acme Corp", "WORKS_AT", Metadata::new())
        .await
        .unwrap();
    engine
        .delete_relation("Ada", "Acme Corp", "WORKS_AT")
        .await
        .unwrap();
    assert!(outgoing(&engine, "Ada").await.is_empty());
    assert!(engine.get_entity("Acme Corp").await.is_ok());
}

#[tokio::test]
async fn test_full_subgraph_opens_next_one() {
    let engine = engine_with(EngineConfig::default().with_subgraph_limits(2, 2)).await;
    for target in ["a", "b", "c"] {
        engine
            .create_or_merge_relation("Hub", target, "LINKS", Metadata::new())
            .await
            .unwrap();
    }

    let hub_edges = outgoing(&engine, "Hub").await;
    let subgraphs: Vec<&str> = hub_edges.iter().map(|r| r.target.as_str()).collect();
    assert_eq!(subgraphs, vec!["Hub::subgraph::1", "Hub::subgraph::2"]);
    assert_eq!(outgoing(&engine, "Hub::subgraph::1").await.len(), 2);
    assert_eq!(outgoing(&engine, "Hub::subgraph::2").await.len(), 1);
}

#[tokio::test]
async fn test_domain_is_most_frequent_type() {
    let engine = engine_with(EngineConfig::default().with_subgraph_limits(2, 50)).await;
    engine
        .create_or_merge_relation("Acme Corp", "Ada", "FOUNDED_BY", Metadata::new())
        .await
        .unwrap();
    engine
        .create_or_merge_relation("Acme Corp", "Grace", "EMPLOYS", Metadata::new())
        .await
        .unwrap();
    engine
        .create_or_merge_relation("Acme Corp", "Alan", "EMPLOYS", Metadata::new())
        .await
        .unwrap();

    let subgraph = engine.get_entity("Acme Corp::subgraph::1").await.unwrap();
    assert_eq!(subgraph.metadata["domain"], json!("EMPLOYS"));
}

#[tokio::test]
async fn test_same_target_with_two_types_stays_addressable() {
    let engine = engine_with(EngineConfig::default().with_subgraph_limits(1, 50)).await;
    engine
        .create_or_merge_relation("Ada", "Grace", "KNOWS", Metadata::new())
        .await
        .unwrap();
    engine
        .create_or_merge_relation("Ada", "Grace", "MENTORS", Metadata::new())
        .await
        .unwrap();

    assert_eq!(outgoing(&engine, "Ada").await.len(), 2);
    engine.delete_relation("Ada", "Grace", "MENTORS").await.unwrap();
    engine.delete_relation("Ada", "Grace", "KNOWS").await.unwrap();
    assert!(outgoing(&engine, "Ada::subgraph::1").await.is_empty());
    assert!(outgoing(&engine, "Ada::subgraph::2").await.is_empty());
}

#[tokio::test]
async fn test_delete_hub_removes_subgraphs() {
    let engine = engine_with(EngineConfig::default().with_subgraph_limits(1, 50)).await;
    engine
        .create_or_merge_relation("Hub", "a", "LINKS", Metadata::new())
        .await
        .unwrap();
    engine
        .create_or_merge_relation("Hub", "b", "LINKS", Metadata::new())
        .await
        .unwrap();
    assert!(engine.get_entity("Hub::subgraph::1").await.is_ok());

    engine.delete_entity("Hub").await.unwrap();
    assert!(engine.get_entity("Hub::subgraph::1").await.is_err());
    assert!(engine.get_entity("a").await.is_ok());
}

#[tokio::test]
async fn test_list_relations_pages_lazily_and_restarts() {
    let engine = engine_with(
        EngineConfig::default()
            .with_subgraph_limits(100, 50)
            .with_page_size(2),
    )
    .await;
    for target in ["e", "d", "c", "b", "a"] {
        engine
            .create_or_merge_relation("Ada", target, "KNOWS", Metadata::new())
            .await
            .unwrap();
    }

    let targets: Vec<String> = outgoing(&engine, "Ada")
        .await
        .into_iter()
        .map(|r| r.target)
        .collect();
    assert_eq!(targets, vec!["a", "b", "c", "d", "e"]);

    let first_two: Vec<Relation> = engine
        .list_relations("Ada", Direction::Outgoing)
        .unwrap()
        .take(2)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(first_two.len(), 2);
    assert_eq!(first_two[0].target, "a");

    let incoming: Vec<Relation> = engine
        .list_relations("c", Direction::Incoming)
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].source, "Ada");
}

#[tokio::test]
async fn test_list_relations_errors_surface_as_items() {
    let engine = engine().await;
    engine
        .create_or_merge_relation("Ada", "Grace", "KNOWS", Metadata::new())
        .await
        .unwrap();
    engine.close().await.unwrap();

    let items: Vec<Result<Relation, MemoryError>> = engine
        .list_relations("Ada", Direction::Both)
        .unwrap()
        .collect()
        .await;
    assert_eq!(items.len(), 1);
    match &items[0] {
        Err(MemoryError::Backend { operation, .. }) => {
            assert_eq!(*operation, Operation::ListRelations)
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_list_relations_is_gated_and_validated() {
    let engine = engine().await;
    assert!(matches!(
        engine.list_relations("", Direction::Both).err(),
        Some(MemoryError::Validation(_))
    ));
}

#[tokio::test]
async fn test_failed_decomposition_keeps_relation_and_warns() {
    let store = WrappedStore::new().await.refusing_markers();
    let engine = MemoryEngine::new(
        Arc::new(store),
        EngineConfig::default().with_subgraph_limits(1, 5),
    );

    let first = engine
        .create_or_merge_relation("Hub", "A", "LINKS", Metadata::new())
        .await
        .unwrap();
    assert!(first.is_clean());

    let second = engine
        .create_or_merge_relation("Hub", "B", "LINKS", Metadata::new())
        .await
        .unwrap();
    assert_eq!(second.value.key(), RelationKey::new("Hub", "B", "LINKS"));
    assert_eq!(second.warnings.len(), 1);
    assert_eq!(second.warnings[0].stage, WarningStage::SubgraphDecomposition);

    let edges = outgoing(&engine, "Hub").await;
    let targets: Vec<&str> = edges.iter().map(|r| r.target.as_str()).collect();
    assert_eq!(targets, vec!["A", "B"]);
    assert!(edges.iter().all(|r| r.relation_type == "LINKS"));
}
