//! Super-node mitigation.
//!
//! When an entity's direct outgoing relations exceed the configured
//! threshold, every direct relation is moved behind sub-graph marker
//! entities: `hub -[CONTAINS_SUBGRAPH]-> "{hub}::subgraph::{n}"` and
//! `subgraph -[CONTAINS {original_relation_type}]-> target`. Decomposition is
//! idempotent: a hub whose direct fan-out is within the threshold is left
//! alone.

use std::collections::{BTreeMap, HashMap};

use serde_json::json;
use tracing::{debug, info};

use graphmem_protocols::{
    CONTAINS, CONTAINS_SUBGRAPH, Direction, EntityUpsert, MemoryError, Metadata, Operation,
    ORIGINAL_RELATION_TYPE, Relation, RelationKey, SUBGRAPH_TYPE,
};

use crate::engine::MemoryEngine;

#[cfg(test)]
#[path = "subgraph_tests.rs"]
mod tests;

const SUBGRAPH_INFIX: &str = "::subgraph::";

pub(crate) fn subgraph_name(hub: &str, index: usize) -> String {
    format!("{}{}{}", hub, SUBGRAPH_INFIX, index)
}

/// Sequence number of a sub-graph of `hub`, if `name` is one.
pub(crate) fn subgraph_index(hub: &str, name: &str) -> Option<usize> {
    name.strip_prefix(hub)?
        .strip_prefix(SUBGRAPH_INFIX)?
        .parse()
        .ok()
}

/// The `CONTAINS` edge standing in for `key` inside `subgraph`.
pub(crate) fn contained_edge(subgraph: &str, key: &RelationKey, properties: Metadata) -> Relation {
    Relation::new(subgraph, &key.target, CONTAINS)
        .with_properties(properties)
        .with_property(ORIGINAL_RELATION_TYPE, json!(key.relation_type))
}

/// Type the hub edge had before it was moved.
pub(crate) fn original_type(edge: &Relation) -> Option<&str> {
    edge.properties
        .get(ORIGINAL_RELATION_TYPE)
        .and_then(|v| v.as_str())
}

/// Present a `CONTAINS` edge as the hub triple it replaced.
pub(crate) fn as_hub_relation(key: &RelationKey, edge: Relation) -> Relation {
    let mut properties = edge.properties;
    properties.remove(ORIGINAL_RELATION_TYPE);
    Relation::new(&key.source, &key.target, &key.relation_type).with_properties(properties)
}

/// Most frequent relation type, ties broken by lexical order.
pub(crate) fn dominant_type(edges: &[Relation]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for edge in edges {
        *counts.entry(edge.relation_type.as_str()).or_insert(0) += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (relation_type, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((relation_type, count));
        }
    }
    best.map(|(relation_type, _)| relation_type.to_string())
}

/// A sub-graph of a hub and the targets it already contains.
#[derive(Debug, Clone)]
pub(crate) struct SubgraphState {
    pub name: String,
    pub index: usize,
    /// target → original relation type
    pub targets: HashMap<String, String>,
}

/// Edges to move into one sub-graph.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Placement {
    pub subgraph: String,
    /// `Some` when the sub-graph has to be created first.
    pub domain: Option<String>,
    pub edges: Vec<Relation>,
}

/// Assign direct hub edges to sub-graphs.
///
/// Edges are taken in (relation_type, target) order. An edge whose target and
/// type already live in a sub-graph goes back there. Otherwise it goes to the
/// latest sub-graph while that one has fewer than `max_entities` targets and
/// does not contain the target yet; a new sub-graph is opened when it cannot.
pub(crate) fn plan_moves(
    hub: &str,
    mut edges: Vec<Relation>,
    mut existing: Vec<SubgraphState>,
    max_entities: usize,
) -> Vec<Placement> {
    edges.sort_by(|a, b| {
        (a.relation_type.as_str(), a.target.as_str())
            .cmp(&(b.relation_type.as_str(), b.target.as_str()))
    });
    existing.sort_by_key(|s| s.index);

    let preexisting = existing.len();
    let mut states = existing;
    let mut moved: Vec<Vec<Relation>> = vec![Vec::new(); states.len()];

    for edge in edges {
        let home = states.iter().position(|s| {
            s.targets.get(&edge.target).map(String::as_str) == Some(edge.relation_type.as_str())
        });

        let slot = match home {
            Some(slot) => slot,
            None => {
                let fits = states.last().is_some_and(|latest| {
                    latest.targets.len() < max_entities && !latest.targets.contains_key(&edge.target)
                });
                if !fits {
                    let index = states.last().map_or(1, |latest| latest.index + 1);
                    states.push(SubgraphState {
                        name: subgraph_name(hub, index),
                        index,
                        targets: HashMap::new(),
                    });
                    moved.push(Vec::new());
                }
                states.len() - 1
            }
        };

        states[slot]
            .targets
            .insert(edge.target.clone(), edge.relation_type.clone());
        moved[slot].push(edge);
    }

    states
        .into_iter()
        .zip(moved)
        .enumerate()
        .filter(|(_, (_, edges))| !edges.is_empty())
        .map(|(slot, (state, edges))| Placement {
            domain: (slot >= preexisting).then(|| dominant_type(&edges)).flatten(),
            subgraph: state.name,
            edges,
        })
        .collect()
}

impl MemoryEngine {
    /// The `CONTAINS` edge holding a decomposed hub triple, if any.
    pub(crate) async fn find_decomposed(
        &self,
        operation: Operation,
        key: &RelationKey,
    ) -> Result<Option<Relation>, MemoryError> {
        for subgraph in self.subgraphs_of(operation, &key.source).await? {
            let contained = RelationKey::new(&subgraph, &key.target, CONTAINS);
            let edge = self
                .call(operation, self.store.fetch_relation(&contained))
                .await?;
            if let Some(edge) = edge {
                if original_type(&edge) == Some(key.relation_type.as_str()) {
                    return Ok(Some(edge));
                }
            }
        }
        Ok(None)
    }

    /// Decompose `hub` if its direct fan-out exceeds the threshold. Returns
    /// the number of edges moved.
    pub(crate) async fn decompose(&self, hub: &str) -> Result<usize, MemoryError> {
        let operation = Operation::CreateRelation;
        let Some(entity) = self.call(operation, self.store.fetch_entity(hub)).await? else {
            return Ok(0);
        };
        if entity.is_subgraph() {
            return Ok(0);
        }

        let (links, direct): (Vec<Relation>, Vec<Relation>) = self
            .all_relations(operation, hub, Direction::Outgoing)
            .await?
            .into_iter()
            .partition(|r| r.relation_type == CONTAINS_SUBGRAPH);
        if direct.len() <= self.config.subgraph_threshold {
            return Ok(0);
        }

        let mut existing = Vec::with_capacity(links.len());
        for link in links {
            let Some(index) = subgraph_index(hub, &link.target) else {
                continue;
            };
            let targets = self
                .all_relations(operation, &link.target, Direction::Outgoing)
                .await?
                .into_iter()
                .filter(|r| r.relation_type == CONTAINS)
                .filter_map(|r| {
                    let original = original_type(&r)?.to_string();
                    Some((r.target, original))
                })
                .collect();
            existing.push(SubgraphState {
                name: link.target,
                index,
                targets,
            });
        }

        let placements = plan_moves(hub, direct, existing, self.config.subgraph_max_entities);
        let mut moved = 0;
        for placement in placements {
            if let Some(domain) = &placement.domain {
                let mut metadata = Metadata::new();
                metadata.insert("parent_entity".to_string(), json!(hub));
                metadata.insert("domain".to_string(), json!(domain));
                metadata.insert(
                    "max_entities".to_string(),
                    json!(self.config.subgraph_max_entities),
                );
                let marker = EntityUpsert::new(&placement.subgraph, SUBGRAPH_TYPE)
                    .with_metadata(metadata)
                    .with_cap(self.config.observation_cap);
                self.call(operation, self.store.upsert_entity(marker)).await?;
                self.call(
                    operation,
                    self.store
                        .upsert_relation(Relation::new(hub, &placement.subgraph, CONTAINS_SUBGRAPH)),
                )
                .await?;
                info!(hub = %hub, subgraph = %placement.subgraph, domain = %domain, "Sub-graph created");
            }

            for edge in placement.edges {
                let key = edge.key();
                let replacement = contained_edge(&placement.subgraph, &key, edge.properties);
                self.call(operation, self.store.upsert_relation(replacement))
                    .await?;
                self.call(operation, self.store.delete_relation(&key)).await?;
                debug!(relation = %key, subgraph = %placement.subgraph, "Relation moved");
                moved += 1;
            }
        }

        info!(
            operation = %operation,
            backend = %self.store.id(),
            hub = %hub,
            moved,
            "Hub entity decomposed"
        );
        Ok(moved)
    }
}
