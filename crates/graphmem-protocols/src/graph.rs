//! Graph records exchanged between the engine, its adapters and clients.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::observation::Observation;
use crate::types::Metadata;

/// Entity type assigned to relation endpoints created implicitly.
pub const UNKNOWN_TYPE: &str = "Unknown";

/// Reserved entity type of sub-graph marker entities.
pub const SUBGRAPH_TYPE: &str = "SubGraph";

/// Relation type linking a hub to one of its sub-graphs.
pub const CONTAINS_SUBGRAPH: &str = "CONTAINS_SUBGRAPH";

/// Relation type linking a sub-graph to an entity moved off its hub.
pub const CONTAINS: &str = "CONTAINS";

/// Property on a `CONTAINS` edge that remembers the hub edge's type.
pub const ORIGINAL_RELATION_TYPE: &str = "original_relation_type";

/// Node property an adapter may use as its compare-and-set counter.
pub const REVISION_PROPERTY: &str = "_graphmem_revision";

/// Property names owned by the engine or the adapters. Callers may not
/// use them as metadata keys.
pub const RESERVED_PROPERTY_KEYS: &[&str] = &[
    "name",
    "type",
    "observations",
    "observation_ts",
    "last_observation_update",
    "embedding",
    "created_at",
    "updated_at",
    REVISION_PROPERTY,
];

/// A named, typed node in the memory graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique, case-sensitive name.
    pub name: String,

    /// Free-form category label.
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Durable facts, merged on write.
    #[serde(default)]
    pub metadata: Metadata,

    /// Timestamped event notes, newest first.
    #[serde(default)]
    pub observations: Vec<String>,

    /// Maximum observation timestamp ever appended (`YYYY-MM-DD HH:MM:SS`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_observation_update: Option<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            metadata: Metadata::new(),
            observations: Vec::new(),
            last_observation_update: None,
        }
    }

    pub fn is_subgraph(&self) -> bool {
        self.entity_type == SUBGRAPH_TYPE
    }

    /// Text used to compute the entity's embedding: name, type, string
    /// metadata values and the three newest observations.
    pub fn embedding_text(&self) -> String {
        let mut parts = vec![self.name.clone(), self.entity_type.clone()];

        let mut keys: Vec<&String> = self.metadata.keys().collect();
        keys.sort();
        for key in keys {
            if let Some(serde_json::Value::String(s)) = self.metadata.get(key) {
                parts.push(s.clone());
            }
        }

        parts.extend(self.observations.iter().take(3).cloned());
        parts.join(" ")
    }
}

/// Write request handed to [`GraphStore::upsert_entity`](crate::GraphStore::upsert_entity).
#[derive(Debug, Clone)]
pub struct EntityUpsert {
    pub name: String,

    /// `None` leaves an existing type untouched and creates new entities as
    /// [`UNKNOWN_TYPE`].
    pub entity_type: Option<String>,

    /// Keys to merge into the stored metadata.
    pub metadata: Metadata,

    /// Observations to append, in call order.
    pub observations: Vec<Observation>,

    /// Maximum observation log length.
    pub observation_cap: usize,
}

impl EntityUpsert {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: Some(entity_type.into()),
            metadata: Metadata::new(),
            observations: Vec::new(),
            observation_cap: crate::observation::DEFAULT_OBSERVATION_CAP,
        }
    }

    /// Request that only makes sure the entity exists.
    pub fn ensure(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: None,
            metadata: Metadata::new(),
            observations: Vec::new(),
            observation_cap: crate::observation::DEFAULT_OBSERVATION_CAP,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_observations(mut self, observations: Vec<Observation>) -> Self {
        self.observations = observations;
        self
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.observation_cap = cap;
        self
    }
}

/// Identity of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationKey {
    pub source: String,
    pub target: String,
    pub relation_type: String,
}

impl RelationKey {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation_type: relation_type.into(),
        }
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})-[{}]->({})", self.source, self.relation_type, self.target)
    }
}

/// A directed, typed edge between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub target: String,
    pub relation_type: String,
    #[serde(default)]
    pub properties: Metadata,
}

impl Relation {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation_type: relation_type.into(),
            properties: Metadata::new(),
        }
    }

    pub fn with_properties(mut self, properties: Metadata) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn key(&self) -> RelationKey {
        RelationKey::new(&self.source, &self.target, &self.relation_type)
    }
}

/// Exact-match criteria over relation triples. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<String>,
}

impl RelationFilter {
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.target.is_none() && self.relation_type.is_none()
    }

    pub fn matches(&self, relation: &Relation) -> bool {
        let field = |want: &Option<String>, have: &str| want.as_deref().is_none_or(|w| w == have);
        field(&self.source, &relation.source)
            && field(&self.target, &relation.target)
            && field(&self.relation_type, &relation.relation_type)
    }
}

/// Which edges of an entity to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Outgoing,
    Incoming,
    Both,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "outgoing" | "out" => Ok(Self::Outgoing),
            "incoming" | "in" => Ok(Self::Incoming),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// Query language accepted by [`GraphStore::run_query`](crate::GraphStore::run_query).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryDialect {
    #[serde(alias = "cypher")]
    OpenCypher,
    Gremlin,
    Sql,
}

impl fmt::Display for QueryDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenCypher => "opencypher",
            Self::Gremlin => "gremlin",
            Self::Sql => "sql",
        };
        f.write_str(name)
    }
}

impl FromStr for QueryDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "opencypher" | "cypher" => Ok(Self::OpenCypher),
            "gremlin" => Ok(Self::Gremlin),
            "sql" => Ok(Self::Sql),
            other => Err(format!("unknown query dialect '{}'", other)),
        }
    }
}

/// Rows returned by a raw query, normalised to JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<serde_json::Value>,
}

/// Distinct labels and keys currently present in the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSchema {
    pub entity_types: Vec<String>,
    pub relation_types: Vec<String>,
    pub entity_property_keys: Vec<String>,
    pub relation_property_keys: Vec<String>,
}

impl GraphSchema {
    /// Sort and deduplicate every list.
    pub fn normalize(mut self) -> Self {
        for list in [
            &mut self.entity_types,
            &mut self.relation_types,
            &mut self.entity_property_keys,
            &mut self.relation_property_keys,
        ] {
            list.sort();
            list.dedup();
        }
        self
    }
}

/// Search strategy for [`search_entities`](crate::GraphStore::search_text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Exact,
    #[default]
    Fulltext,
    Semantic,
    Hybrid,
}

impl SearchMode {
    /// Whether the mode needs an embedding provider.
    pub fn needs_embeddings(&self) -> bool {
        matches!(self, Self::Semantic | Self::Hybrid)
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "fulltext" | "full_text" => Ok(Self::Fulltext),
            "semantic" => Ok(Self::Semantic),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("unknown search mode '{}'", other)),
        }
    }
}

/// Native text match strategy of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    /// Case-insensitive name equality.
    Exact,
    /// Term matching over name, type and metadata.
    Fulltext,
}

/// An entity with a relevance score in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntity {
    pub entity: Entity,
    pub score: f32,
}

/// Entities within a hop radius and the relations among them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

/// One window of the whole graph: entities in name order and the outgoing
/// relations of exactly those entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPage {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    /// Offset of the following page, absent on the last one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
}

/// Reachability of the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    Available,
    Unavailable,
}

/// Health report of a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStatus {
    pub backend: String,
    pub availability: Availability,
    pub dialects: Vec<QueryDialect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
