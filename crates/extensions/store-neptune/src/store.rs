//! Neptune graph store implementation.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, warn};

use graphmem_protocols::error::StoreError;
use graphmem_protocols::{
    Availability, Direction, Entity, EntityUpsert, GraphSchema, GraphStore, Metadata,
    ObservationLog, Page, QueryDialect, QueryResult, REVISION_PROPERTY, Relation,
    RelationFilter, RelationKey, SUBGRAPH_TYPE, ScoredEntity, StoreStatus, TextMatch,
    UNKNOWN_TYPE,
};

use crate::client::{NeptuneClient, NeptuneStoreConfig};
use crate::cypher;
use crate::rows::{
    decode_list, entity_from_row, is_edge_key, is_node_key, relation_from_row, strip_keys,
    string_field,
};

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

const DIALECTS: &[QueryDialect] = &[QueryDialect::OpenCypher, QueryDialect::Gremlin];

/// Attempts at the compare-and-set entity write before giving up.
const MAX_WRITE_ATTEMPTS: usize = 8;

/// Candidate rows fetched per requested result during term search.
const TERM_CANDIDATE_FACTOR: usize = 10;

/// Node properties that term search never looks at.
const UNSEARCHED_KEYS: &[&str] = &[
    "observations",
    "observation_ts",
    "embedding",
    "created_at",
    "updated_at",
    "last_observation_update",
    REVISION_PROPERTY,
];

/// Graph store backed by a Neptune-compatible HTTP endpoint.
pub struct NeptuneGraphStore {
    client: NeptuneClient,
}

impl NeptuneGraphStore {
    pub fn new(config: NeptuneStoreConfig) -> Result<Self, StoreError> {
        if config.endpoint.trim().is_empty() {
            return Err(StoreError::InvalidRequest(
                "Neptune endpoint must not be empty".to_string(),
            ));
        }
        let client = NeptuneClient::new(&config)?;
        debug!(endpoint = %client.base_url(), "Created Neptune graph store");
        Ok(Self { client })
    }

    async fn read_entity(&self, name: &str) -> Result<Option<(Entity, i64)>, StoreError> {
        let rows = self
            .client
            .cypher(cypher::FETCH_ENTITY, &json!({ "name": name }))
            .await?;
        rows.first().map(entity_from_row).transpose()
    }

    fn entities_from_rows(rows: &[Value]) -> Result<Vec<Entity>, StoreError> {
        rows.iter()
            .map(|row| entity_from_row(row).map(|(entity, _)| entity))
            .collect()
    }

    async fn missing_endpoint(&self, relation: &Relation) -> Result<String, StoreError> {
        let rows = self
            .client
            .cypher(
                cypher::ENTITY_EXISTS,
                &json!({ "names": [relation.source, relation.target] }),
            )
            .await?;
        let present: Vec<String> = rows
            .iter()
            .filter_map(|row| string_field(row, "name").ok())
            .collect();

        Ok([&relation.source, &relation.target]
            .into_iter()
            .find(|name| !present.contains(*name))
            .unwrap_or(&relation.target)
            .clone())
    }

    async fn distinct_values(
        &self,
        query: &str,
        skip: fn(&str) -> bool,
    ) -> Result<Vec<String>, StoreError> {
        let rows = self.client.cypher(query, &json!({})).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("value").and_then(Value::as_str))
            .filter(|value| !skip(*value))
            .map(String::from)
            .collect())
    }
}

/// Fraction of query terms found in the entity's searchable text.
fn term_coverage(entity: &Entity, terms: &[String]) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }
    let mut haystack = format!("{} {}", entity.name, entity.entity_type).to_lowercase();
    for value in entity.metadata.values() {
        haystack.push(' ');
        match value {
            Value::String(s) => haystack.push_str(&s.to_lowercase()),
            other => haystack.push_str(&other.to_string().to_lowercase()),
        }
    }
    let hits = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
    hits as f32 / terms.len() as f32
}

fn key_params(key: &RelationKey) -> Value {
    json!({ "source": key.source, "target": key.target, "type": key.relation_type })
}

fn no_skip(_: &str) -> bool {
    false
}

#[async_trait]
impl GraphStore for NeptuneGraphStore {
    fn id(&self) -> &str {
        "neptune"
    }

    fn dialects(&self) -> &[QueryDialect] {
        DIALECTS
    }

    async fn upsert_entity(&self, upsert: EntityUpsert) -> Result<Entity, StoreError> {
        let metadata = strip_keys(&upsert.metadata, is_node_key);

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let (mut entity, revision) = self
                .read_entity(&upsert.name)
                .await?
                .unwrap_or_else(|| (Entity::new(&upsert.name, UNKNOWN_TYPE), 0));

            if let Some(entity_type) = &upsert.entity_type {
                entity.entity_type = entity_type.clone();
            }

            if !upsert.observations.is_empty() {
                let mut log = ObservationLog::from_stored(
                    std::mem::take(&mut entity.observations),
                    entity.last_observation_update.as_deref(),
                    upsert.observation_cap,
                );
                for observation in &upsert.observations {
                    log.append(observation);
                }
                let (entries, last_update) = log.into_parts();
                entity.observations = entries;
                entity.last_observation_update = last_update;
            }

            let params = json!({
                "name": entity.name,
                "type": entity.entity_type,
                "observations": serde_json::to_string(&entity.observations)?,
                "last_update": entity.last_observation_update,
                "metadata": metadata,
                "revision": revision,
                "now": Utc::now().to_rfc3339(),
            });

            let rows = self.client.cypher(cypher::WRITE_ENTITY, &params).await?;
            if let Some(row) = rows.first() {
                let (written, _) = entity_from_row(row)?;
                return Ok(written);
            }

            debug!(entity = %upsert.name, attempt, "Entity revision changed during write, retrying");
        }

        Err(StoreError::query(
            QueryDialect::OpenCypher,
            cypher::WRITE_ENTITY,
            format!(
                "entity '{}' kept changing during {} write attempts",
                upsert.name, MAX_WRITE_ATTEMPTS
            ),
        ))
    }

    async fn upsert_relation(&self, relation: Relation) -> Result<Relation, StoreError> {
        let params = json!({
            "source": relation.source,
            "target": relation.target,
            "type": relation.relation_type,
            "properties": strip_keys(&relation.properties, is_edge_key),
            "now": Utc::now().to_rfc3339(),
        });

        let rows = self.client.cypher(cypher::UPSERT_RELATION, &params).await?;
        match rows.first() {
            Some(row) => relation_from_row(row),
            None => Err(StoreError::MissingEndpoint(
                self.missing_endpoint(&relation).await?,
            )),
        }
    }

    async fn delete_entity(&self, name: &str) -> Result<bool, StoreError> {
        let rows = self
            .client
            .cypher(cypher::DELETE_ENTITY, &json!({ "name": name }))
            .await?;
        Ok(!rows.is_empty())
    }

    async fn delete_relation(&self, key: &RelationKey) -> Result<bool, StoreError> {
        let rows = self
            .client
            .cypher(cypher::DELETE_RELATION, &key_params(key))
            .await?;
        Ok(!rows.is_empty())
    }

    async fn fetch_entity(&self, name: &str) -> Result<Option<Entity>, StoreError> {
        Ok(self.read_entity(name).await?.map(|(entity, _)| entity))
    }

    async fn fetch_relation(&self, key: &RelationKey) -> Result<Option<Relation>, StoreError> {
        let rows = self
            .client
            .cypher(cypher::FETCH_RELATION, &key_params(key))
            .await?;
        rows.first().map(relation_from_row).transpose()
    }

    async fn list_relations(
        &self,
        name: &str,
        direction: Direction,
        page: Page,
    ) -> Result<Vec<Relation>, StoreError> {
        let query = match direction {
            Direction::Outgoing => cypher::LIST_OUTGOING,
            Direction::Incoming => cypher::LIST_INCOMING,
            Direction::Both => cypher::LIST_BOTH,
        };
        let rows = self
            .client
            .cypher(
                query,
                &json!({ "name": name, "offset": page.offset, "limit": page.limit }),
            )
            .await?;
        rows.iter().map(relation_from_row).collect()
    }

    async fn run_query(
        &self,
        dialect: QueryDialect,
        text: &str,
        params: &Metadata,
    ) -> Result<QueryResult, StoreError> {
        match dialect {
            QueryDialect::OpenCypher => {
                let rows = self.client.cypher(text, &json!(params)).await?;
                Ok(QueryResult { rows })
            }
            QueryDialect::Gremlin => {
                let rows = match self.client.gremlin(text, params).await? {
                    Value::Array(items) => items,
                    Value::Null => Vec::new(),
                    other => vec![other],
                };
                Ok(QueryResult { rows })
            }
            other => Err(StoreError::UnsupportedDialect(other)),
        }
    }

    async fn fetch_schema(&self) -> Result<Option<GraphSchema>, StoreError> {
        let schema = GraphSchema {
            entity_types: self.distinct_values(cypher::ENTITY_TYPES, no_skip).await?,
            relation_types: self.distinct_values(cypher::RELATION_TYPES, no_skip).await?,
            entity_property_keys: self.distinct_values(cypher::ENTITY_KEYS, is_node_key).await?,
            relation_property_keys: self
                .distinct_values(cypher::RELATION_KEYS, is_edge_key)
                .await?,
        };
        Ok(Some(schema.normalize()))
    }

    async fn search_text(
        &self,
        query: &str,
        mode: TextMatch,
        limit: usize,
    ) -> Result<Vec<ScoredEntity>, StoreError> {
        match mode {
            TextMatch::Exact => {
                let rows = self
                    .client
                    .cypher(
                        cypher::EXACT_SEARCH,
                        &json!({
                            "query": query.trim(),
                            "limit": limit,
                            "marker_type": SUBGRAPH_TYPE,
                        }),
                    )
                    .await?;
                Ok(Self::entities_from_rows(&rows)?
                    .into_iter()
                    .map(|entity| ScoredEntity { entity, score: 1.0 })
                    .collect())
            }
            TextMatch::Fulltext => {
                let terms: Vec<String> = query
                    .split_whitespace()
                    .map(str::to_lowercase)
                    .collect();
                if terms.is_empty() {
                    return Ok(Vec::new());
                }

                let rows = self
                    .client
                    .cypher(
                        cypher::TERM_SEARCH,
                        &json!({
                            "terms": terms,
                            "skip_keys": UNSEARCHED_KEYS,
                            "marker_type": SUBGRAPH_TYPE,
                            "limit": limit.saturating_mul(TERM_CANDIDATE_FACTOR),
                        }),
                    )
                    .await?;

                let mut scored: Vec<ScoredEntity> = Self::entities_from_rows(&rows)?
                    .into_iter()
                    .map(|entity| {
                        let score = term_coverage(&entity, &terms);
                        ScoredEntity { entity, score }
                    })
                    .filter(|s| s.score > 0.0)
                    .collect();

                scored.sort_by(|a, b| {
                    b.score
                        .total_cmp(&a.score)
                        .then_with(|| a.entity.name.cmp(&b.entity.name))
                });
                scored.truncate(limit);
                Ok(scored)
            }
        }
    }

    async fn find_entities(
        &self,
        filter: &Metadata,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<&str> = filter.keys().map(String::as_str).collect();
        keys.sort_unstable();

        let mut params = serde_json::Map::new();
        for (i, key) in keys.iter().enumerate() {
            params.insert(format!("p{}", i), filter[*key].clone());
        }
        params.insert("limit".to_string(), json!(limit));

        let rows = self
            .client
            .cypher(&cypher::find_entities_query(&keys), &Value::Object(params))
            .await?;
        rows.iter().map(|row| string_field(row, "name")).collect()
    }

    async fn list_entities(&self, page: Page) -> Result<Vec<Entity>, StoreError> {
        let rows = self
            .client
            .cypher(
                cypher::LIST_ENTITIES,
                &json!({ "offset": page.offset, "limit": page.limit }),
            )
            .await?;
        Self::entities_from_rows(&rows)
    }

    async fn find_relations(
        &self,
        filter: &RelationFilter,
        limit: usize,
    ) -> Result<Vec<Relation>, StoreError> {
        let params = json!({
            "source": filter.source,
            "target": filter.target,
            "type": filter.relation_type,
            "limit": limit,
        });
        let rows = self.client.cypher(cypher::FIND_RELATIONS, &params).await?;
        rows.iter().map(relation_from_row).collect()
    }

    async fn upsert_embedding(&self, name: &str, vector: &[f32]) -> Result<(), StoreError> {
        let rows = self
            .client
            .cypher(
                cypher::SET_EMBEDDING,
                &json!({ "name": name, "embedding": serde_json::to_string(vector)? }),
            )
            .await?;
        if rows.is_empty() {
            return Err(StoreError::InvalidRequest(
                "cannot store an embedding for a missing entity".to_string(),
            ));
        }
        Ok(())
    }

    async fn entity_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>, StoreError> {
        let rows = self
            .client
            .cypher(cypher::ENTITY_EMBEDDINGS, &json!({}))
            .await?;

        let mut embeddings = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = string_field(row, "name")?;
            match decode_list::<f32>(row.get("embedding")) {
                Ok(vector) => embeddings.push((name, vector)),
                Err(e) => warn!(entity = %name, error = %e, "Skipping unreadable embedding"),
            }
        }
        Ok(embeddings)
    }

    async fn status(&self) -> StoreStatus {
        let (availability, detail) = match self.client.health().await {
            Ok(body) => {
                let state = body
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                let availability = if state.eq_ignore_ascii_case("healthy") {
                    Availability::Available
                } else {
                    Availability::Unavailable
                };
                (availability, Some(state))
            }
            Err(e) => {
                debug!(error = %e, "Neptune status check failed");
                (Availability::Unavailable, Some(e.to_string()))
            }
        };

        StoreStatus {
            backend: self.id().to_string(),
            availability,
            dialects: DIALECTS.to_vec(),
            detail,
        }
    }
}
