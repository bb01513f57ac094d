//! Whole-graph paging and relation lookup.

use tracing::debug;

use graphmem_protocols::{
    Direction, GraphPage, MemoryError, Operation, Page, Relation, RelationFilter,
};

use crate::engine::{MAX_FIND_RESULTS, MemoryEngine};
use crate::validation::require_non_empty;

#[cfg(test)]
#[path = "browse_tests.rs"]
mod tests;

impl MemoryEngine {
    /// Entities `offset..offset + limit` in name order, with every outgoing
    /// relation of those entities. Walking the pages visits each entity and
    /// each relation exactly once. `limit` is capped at 1000.
    pub async fn read_graph(&self, offset: usize, limit: usize) -> Result<GraphPage, MemoryError> {
        let operation = Operation::ReadGraph;
        self.gate(operation)?;
        if limit == 0 {
            return Err(MemoryError::validation("limit must be at least 1"));
        }
        let limit = limit.min(MAX_FIND_RESULTS);

        // One extra row tells whether another page follows.
        let mut entities = self
            .call(operation, self.store.list_entities(Page::new(offset, limit + 1)))
            .await?;
        let next_offset = if entities.len() > limit {
            entities.truncate(limit);
            Some(offset + limit)
        } else {
            None
        };

        let mut relations = Vec::new();
        for entity in &entities {
            relations.extend(
                self.all_relations(operation, &entity.name, Direction::Outgoing)
                    .await?,
            );
        }

        debug!(
            operation = %operation,
            backend = %self.store.id(),
            offset,
            entities = entities.len(),
            relations = relations.len(),
            "Graph page read"
        );
        Ok(GraphPage {
            entities,
            relations,
            next_offset,
        })
    }

    /// Stored relations equal to every set field of `filter`, ordered by
    /// (source, relation_type, target). Edges moved into sub-graphs are
    /// returned as stored, like [`list_relations`](Self::list_relations).
    pub async fn find_relations(
        &self,
        filter: &RelationFilter,
    ) -> Result<Vec<Relation>, MemoryError> {
        let operation = Operation::FindRelations;
        self.gate(operation)?;
        if filter.is_empty() {
            return Err(MemoryError::validation(
                "filter must set source, target or relation_type",
            ));
        }
        for (field, value) in [
            ("source", &filter.source),
            ("target", &filter.target),
            ("relation_type", &filter.relation_type),
        ] {
            if let Some(value) = value {
                require_non_empty(field, value)?;
            }
        }

        self.call(
            operation,
            self.store.find_relations(filter, MAX_FIND_RESULTS),
        )
        .await
    }
}
