//! Entity search.
//!
//! `exact` and `fulltext` delegate to the store. `semantic` ranks stored
//! entity embeddings against the embedded query. `hybrid` fuses the semantic
//! ranking with the fulltext one by weighted sum.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use graphmem_protocols::{
    EmbeddingProvider, Entity, MemoryError, Operation, ScoredEntity, SearchMode, TextMatch,
};

use crate::engine::MemoryEngine;
use crate::fusion::{rank_by_similarity, weighted_fusion};
use crate::validation::require_non_empty;

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;

impl MemoryEngine {
    /// Search entities. `top_k` defaults to the configured value.
    pub async fn search_entities(
        &self,
        query: &str,
        top_k: Option<usize>,
        mode: SearchMode,
    ) -> Result<Vec<ScoredEntity>, MemoryError> {
        let operation = Operation::SearchEntities;
        self.gate(operation)?;
        require_non_empty("query", query)?;
        let top_k = top_k.unwrap_or(self.config.search.default_top_k);
        if top_k == 0 {
            return Err(MemoryError::validation("top_k must be at least 1"));
        }

        let results = match mode {
            SearchMode::Exact => {
                self.call(operation, self.store.search_text(query, TextMatch::Exact, top_k))
                    .await?
            }
            SearchMode::Fulltext => {
                self.call(
                    operation,
                    self.store.search_text(query, TextMatch::Fulltext, top_k),
                )
                .await?
            }
            SearchMode::Semantic => {
                let provider = self.require_embedder(mode)?;
                let ranked = self.semantic_ranking(&provider, query, top_k).await?;
                self.materialize(ranked, HashMap::new()).await?
            }
            SearchMode::Hybrid => {
                let provider = self.require_embedder(mode)?;
                self.hybrid_search(&provider, query, top_k).await?
            }
        };

        debug!(
            operation = %operation,
            backend = %self.store.id(),
            mode = ?mode,
            top_k,
            hits = results.len(),
            "Search completed"
        );
        Ok(results)
    }

    fn require_embedder(&self, mode: SearchMode) -> Result<Arc<dyn EmbeddingProvider>, MemoryError> {
        self.embedder.clone().ok_or_else(|| {
            MemoryError::configuration(format!(
                "{:?} search requires an embedding provider, but none is configured",
                mode
            ))
        })
    }

    async fn semantic_ranking(
        &self,
        provider: &Arc<dyn EmbeddingProvider>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<(String, f32)>, MemoryError> {
        let operation = Operation::SearchEntities;
        let query = self.embed(operation, provider.as_ref(), query).await?;
        let stored = self
            .call(operation, self.store.entity_embeddings())
            .await?;
        Ok(rank_by_similarity(&query, stored, limit))
    }

    async fn hybrid_search(
        &self,
        provider: &Arc<dyn EmbeddingProvider>,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredEntity>, MemoryError> {
        let operation = Operation::SearchEntities;
        let candidates = top_k.saturating_mul(self.config.search.candidate_multiplier);

        let (semantic, keyword) = tokio::join!(
            self.semantic_ranking(provider, query, candidates),
            self.call(
                operation,
                self.store.search_text(query, TextMatch::Fulltext, candidates)
            )
        );
        let semantic = semantic?;
        let keyword = keyword?;

        let keyword_scores: Vec<(String, f32)> = keyword
            .iter()
            .map(|hit| (hit.entity.name.clone(), hit.score))
            .collect();
        let known: HashMap<String, Entity> = keyword
            .into_iter()
            .map(|hit| (hit.entity.name.clone(), hit.entity))
            .collect();

        let mut fused = weighted_fusion(
            &semantic,
            &keyword_scores,
            self.config.search.semantic_weight,
            self.config.search.keyword_weight,
        );
        fused.truncate(top_k);
        self.materialize(fused, known).await
    }

    /// Attach entity snapshots to ranked names. Names whose entity has gone
    /// are dropped.
    async fn materialize(
        &self,
        ranked: Vec<(String, f32)>,
        mut known: HashMap<String, Entity>,
    ) -> Result<Vec<ScoredEntity>, MemoryError> {
        let mut out = Vec::with_capacity(ranked.len());
        for (name, score) in ranked {
            let entity = match known.remove(&name) {
                Some(entity) => Some(entity),
                None => {
                    self.call(Operation::SearchEntities, self.store.fetch_entity(&name))
                        .await?
                }
            };
            if let Some(entity) = entity {
                out.push(ScoredEntity { entity, score });
            }
        }
        Ok(out)
    }
}
