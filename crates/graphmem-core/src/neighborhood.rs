//! Bounded graph traversal.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use graphmem_protocols::{
    Direction, Entity, MemoryError, Neighborhood, Operation, Relation, RelationKey,
};

use crate::engine::MemoryEngine;
use crate::validation::require_non_empty;

#[cfg(test)]
#[path = "neighborhood_tests.rs"]
mod tests;

/// Deepest hop radius served.
pub const MAX_NEIGHBORHOOD_DEPTH: usize = 2;

impl MemoryEngine {
    /// Entities within `depth` hops of `names` in either direction, and the
    /// relations among them. Depth is clamped to [`MAX_NEIGHBORHOOD_DEPTH`].
    /// Missing seeds are skipped; if none exist the call fails with
    /// `NotFound`.
    pub async fn read_neighborhood(
        &self,
        names: &[String],
        depth: usize,
    ) -> Result<Neighborhood, MemoryError> {
        let operation = Operation::ReadNeighborhood;
        self.gate(operation)?;
        if names.is_empty() {
            return Err(MemoryError::validation("at least one entity name is required"));
        }
        for name in names {
            require_non_empty("entity name", name)?;
        }
        let depth = depth.min(MAX_NEIGHBORHOOD_DEPTH);

        let mut entities: BTreeMap<String, Entity> = BTreeMap::new();
        let mut frontier = Vec::new();
        for name in names {
            if entities.contains_key(name) {
                continue;
            }
            if let Some(entity) = self.call(operation, self.store.fetch_entity(name)).await? {
                entities.insert(name.clone(), entity);
                frontier.push(name.clone());
            }
        }
        if entities.is_empty() {
            return Err(MemoryError::not_found(format!(
                "none of the entities exist: {}",
                names.join(", ")
            )));
        }

        let mut expanded: HashMap<String, Vec<Relation>> = HashMap::new();
        for _ in 0..depth {
            let mut next = Vec::new();
            for name in &frontier {
                let relations = self.all_relations(operation, name, Direction::Both).await?;
                for relation in &relations {
                    for endpoint in [&relation.source, &relation.target] {
                        if entities.contains_key(endpoint) {
                            continue;
                        }
                        if let Some(entity) =
                            self.call(operation, self.store.fetch_entity(endpoint)).await?
                        {
                            entities.insert(endpoint.clone(), entity);
                            next.push(endpoint.clone());
                        }
                    }
                }
                expanded.insert(name.clone(), relations);
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        let mut relations: BTreeMap<RelationKey, Relation> = BTreeMap::new();
        for name in entities.keys() {
            let touching = match expanded.remove(name) {
                Some(known) => known,
                None => self.all_relations(operation, name, Direction::Outgoing).await?,
            };
            for relation in touching {
                if entities.contains_key(&relation.source) && entities.contains_key(&relation.target) {
                    relations.insert(relation.key(), relation);
                }
            }
        }

        debug!(
            operation = %operation,
            backend = %self.store.id(),
            depth,
            entities = entities.len(),
            relations = relations.len(),
            "Neighborhood read"
        );
        Ok(Neighborhood {
            entities: entities.into_values().collect(),
            relations: relations.into_values().collect(),
        })
    }
}
