use super::*;
use crate::test_support::{engine, engine_with, engine_with_embeddings, metadata};
use async_trait::async_trait;
use graphmem_embedding::HashEmbedding;
use graphmem_protocols::{Embedding, EmbeddingError, ErrorKind, Metadata};
use serde_json::json;

struct ConstantProvider;

#[async_trait]
impl EmbeddingProvider for ConstantProvider {
    fn id(&self) -> &str {
        "constant"
    }

    async fn embed(&self, _text: &str) -> Result<Embedding, EmbeddingError> {
        Ok(Embedding::new(vec![1.0, 0.0]))
    }

    fn dimension(&self) -> usize {
        2
    }
}

async fn seed(engine: &MemoryEngine) {
    engine
        .create_or_merge_entity(
            "Ada",
            "Person",
            metadata(&[("role", json!("senior engineer")), ("city", json!("Seattle"))]),
            &[],
        )
        .await
        .unwrap();
    engine
        .create_or_merge_entity(
            "Quarterly Report",
            "Document",
            metadata(&[("topic", json!("revenue"))]),
            &[],
        )
        .await
        .unwrap();
    engine
        .create_or_merge_entity("Grace", "Person", metadata(&[("role", json!("admiral"))]), &[])
        .await
        .unwrap();
}

fn names(results: &[ScoredEntity]) -> Vec<&str> {
    results.iter().map(|r| r.entity.name.as_str()).collect()
}

#[tokio::test]
async fn test_exact_search() {
    let engine = engine().await;
    seed(&engine).await;
    let results = engine
        .search_entities("ada", Some(5), SearchMode::Exact)
        .await
        .unwrap();
    assert_eq!(names(&results), vec!["Ada"]);
}

#[tokio::test]
async fn test_fulltext_search_over_metadata() {
    let engine = engine().await;
    seed(&engine).await;
    let results = engine
        .search_entities("revenue", None, SearchMode::Fulltext)
        .await
        .unwrap();
    assert_eq!(names(&results), vec!["Quarterly Report"]);
    assert!(results[0].score > 0.0 && results[0].score <= 1.0);
}

#[tokio::test]
async fn test_semantic_without_provider_is_configuration_error() {
    let engine = engine().await;
    for mode in [SearchMode::Semantic, SearchMode::Hybrid] {
        let err = engine
            .search_entities("engineer", Some(5), mode)
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Configuration(_)));
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }
}

#[tokio::test]
async fn test_invalid_search_arguments() {
    let engine = engine().await;
    let err = engine
        .search_entities("engineer", Some(0), SearchMode::Fulltext)
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));

    let err = engine
        .search_entities("  ", Some(3), SearchMode::Exact)
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));
}

#[tokio::test]
async fn test_semantic_ranks_by_similarity() {
    let engine = engine_with_embeddings().await;
    seed(&engine).await;
    let results = engine
        .search_entities("senior engineer in seattle", Some(2), SearchMode::Semantic)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].entity.name, "Ada");
    assert!(results[0].score >= results[1].score);
}

#[tokio::test]
async fn test_semantic_ties_break_by_name() {
    let engine = engine().await.with_embedder(Arc::new(ConstantProvider));
    for name in ["Zed", "Alan", "Grace"] {
        engine
            .create_or_merge_entity(name, "Person", Metadata::new(), &[])
            .await
            .unwrap();
    }
    let results = engine
        .search_entities("anyone", Some(10), SearchMode::Semantic)
        .await
        .unwrap();
    assert_eq!(names(&results), vec!["Alan", "Grace", "Zed"]);
    assert!(results.iter().all(|r| (r.score - 1.0).abs() < 1e-6));
}

#[tokio::test]
async fn test_hybrid_prefers_entities_matched_both_ways() {
    let engine = engine_with_embeddings().await;
    seed(&engine).await;
    let results = engine
        .search_entities("senior engineer", Some(3), SearchMode::Hybrid)
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].entity.name, "Ada");
    assert!(results.len() <= 3);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_hybrid_respects_top_k() {
    let engine = engine().await.with_embedder(Arc::new(ConstantProvider));
    seed(&engine).await;
    let results = engine
        .search_entities("Person", Some(1), SearchMode::Hybrid)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_search_allowed_in_read_mode() {
    let engine = engine().await;
    seed(&engine).await;
    let store = Arc::clone(&engine.store);
    let reader = MemoryEngine::new(
        store,
        crate::EngineConfig::default().with_mode(graphmem_protocols::Mode::Read),
    );
    let results = reader
        .search_entities("Grace", None, SearchMode::Exact)
        .await
        .unwrap();
    assert_eq!(names(&results), vec!["Grace"]);
}

#[tokio::test]
async fn test_text_modes_leave_out_subgraph_markers() {
    let engine = engine_with(crate::EngineConfig::default().with_subgraph_limits(1, 5))
        .await
        .with_embedder(Arc::new(HashEmbedding::new(64)));
    for target in ["Alpha", "Beta"] {
        engine
            .create_or_merge_relation("Acme Corp", target, "OWNS", Metadata::new())
            .await
            .unwrap();
    }
    assert!(engine.get_entity("Acme Corp::subgraph::1").await.is_ok());

    for mode in [SearchMode::Fulltext, SearchMode::Hybrid] {
        let results = engine
            .search_entities("Acme", Some(10), mode)
            .await
            .unwrap();
        assert_eq!(results[0].entity.name, "Acme Corp");
        assert!(results.iter().all(|r| !r.entity.is_subgraph()));
    }
}
