//! SQLite graph store implementation.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, TransactionBehavior, params};
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, warn};

use graphmem_protocols::error::StoreError;
use graphmem_protocols::{
    Availability, Direction, Entity, EntityUpsert, GraphSchema, GraphStore, Metadata,
    ObservationLog, Page, QueryDialect, QueryResult, Relation, RelationFilter, RelationKey,
    ScoredEntity,
    StoreStatus, TextMatch, UNKNOWN_TYPE,
};

use crate::schema::init_schema;

#[path = "store_rows.rs"]
mod store_rows;
use store_rows::{ENTITY_COLUMNS, entity_from_row, load_entity, relation_from_row, to_json_text};

#[path = "store_query.rs"]
mod store_query;
use store_query::{execute_raw, introspect_schema};

#[path = "store_search.rs"]
mod store_search;
use store_search::{exact_search, filter_entities, filter_relations, fulltext_search};

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

const DIALECTS: &[QueryDialect] = &[QueryDialect::Sql];

/// Embedded graph store backed by a single SQLite connection.
///
/// All statements run on the connection's dedicated thread, so each call is
/// serialised; entity upserts additionally run inside an immediate
/// transaction so the observation read-modify-write is atomic.
pub struct SqliteGraphStore {
    conn: Connection,
}

fn store_err(operation: &'static str) -> impl FnOnce(tokio_rusqlite::Error) -> StoreError {
    move |e| match e {
        tokio_rusqlite::Error::ConnectionClosed => {
            StoreError::Connection("sqlite connection is closed".to_string())
        }
        other => StoreError::query(QueryDialect::Sql, operation, other),
    }
}

impl SqliteGraphStore {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::init(conn).await
    }

    /// Create or open a file-backed database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Connection(e.to_string()))?;
        }
        debug!(path = %path.display(), "Opening SQLite graph store");
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(store_err("init_schema"))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    fn id(&self) -> &str {
        "sqlite"
    }

    fn dialects(&self) -> &[QueryDialect] {
        DIALECTS
    }

    async fn upsert_entity(&self, upsert: EntityUpsert) -> Result<Entity, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let mut entity = load_entity(&tx, &upsert.name)?
                    .unwrap_or_else(|| Entity::new(&upsert.name, UNKNOWN_TYPE));

                if let Some(entity_type) = upsert.entity_type {
                    entity.entity_type = entity_type;
                }
                entity.metadata.extend(upsert.metadata);

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

                tx.execute(
                    "INSERT INTO entities (name, entity_type, metadata, observations,
                         last_observation_update, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                     ON CONFLICT(name) DO UPDATE SET
                         entity_type = excluded.entity_type,
                         metadata = excluded.metadata,
                         observations = excluded.observations,
                         last_observation_update = excluded.last_observation_update,
                         updated_at = excluded.updated_at",
                    params![
                        entity.name,
                        entity.entity_type,
                        to_json_text(&entity.metadata)?,
                        to_json_text(&entity.observations)?,
                        entity.last_observation_update,
                        now
                    ],
                )?;

                tx.commit()?;
                Ok(entity)
            })
            .await
            .map_err(store_err("upsert_entity"))
    }

    async fn upsert_relation(&self, relation: Relation) -> Result<Relation, StoreError> {
        let now = Utc::now().to_rfc3339();
        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                for endpoint in [&relation.source, &relation.target] {
                    let exists = tx
                        .prepare("SELECT 1 FROM entities WHERE name = ?1")?
                        .exists([endpoint])?;
                    if !exists {
                        return Ok(Err(endpoint.clone()));
                    }
                }

                let existing: Option<String> = tx
                    .query_row(
                        "SELECT properties FROM relations
                         WHERE source = ?1 AND target = ?2 AND relation_type = ?3",
                        params![relation.source, relation.target, relation.relation_type],
                        |row| row.get(0),
                    )
                    .optional()?;

                let mut properties: Metadata = existing
                    .and_then(|text| serde_json::from_str(&text).ok())
                    .unwrap_or_default();
                properties.extend(relation.properties);

                tx.execute(
                    "INSERT INTO relations (source, target, relation_type, properties, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                     ON CONFLICT(source, target, relation_type) DO UPDATE SET
                         properties = excluded.properties,
                         updated_at = excluded.updated_at",
                    params![
                        relation.source,
                        relation.target,
                        relation.relation_type,
                        to_json_text(&properties)?,
                        now
                    ],
                )?;

                tx.commit()?;
                Ok(Ok(Relation {
                    source: relation.source,
                    target: relation.target,
                    relation_type: relation.relation_type,
                    properties,
                }))
            })
            .await
            .map_err(store_err("upsert_relation"))?;

        outcome.map_err(StoreError::MissingEndpoint)
    }

    async fn delete_entity(&self, name: &str) -> Result<bool, StoreError> {
        let name = name.to_string();
        self.conn
            .call(move |conn| {
                let deleted = conn.execute("DELETE FROM entities WHERE name = ?1", [&name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(store_err("delete_entity"))
    }

    async fn delete_relation(&self, key: &RelationKey) -> Result<bool, StoreError> {
        let key = key.clone();
        self.conn
            .call(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM relations WHERE source = ?1 AND target = ?2 AND relation_type = ?3",
                    params![key.source, key.target, key.relation_type],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(store_err("delete_relation"))
    }

    async fn fetch_entity(&self, name: &str) -> Result<Option<Entity>, StoreError> {
        let name = name.to_string();
        self.conn
            .call(move |conn| Ok(load_entity(conn, &name)?))
            .await
            .map_err(store_err("fetch_entity"))
    }

    async fn fetch_relation(&self, key: &RelationKey) -> Result<Option<Relation>, StoreError> {
        let key = key.clone();
        self.conn
            .call(move |conn| {
                let relation = conn.query_row(
                    "SELECT source, target, relation_type, properties FROM relations
                     WHERE source = ?1 AND target = ?2 AND relation_type = ?3",
                    params![key.source, key.target, key.relation_type],
                    relation_from_row,
                );
                match relation {
                    Ok(relation) => Ok(Some(relation)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(store_err("fetch_relation"))
    }

    async fn list_relations(
        &self,
        name: &str,
        direction: Direction,
        page: Page,
    ) -> Result<Vec<Relation>, StoreError> {
        let name = name.to_string();
        let filter = match direction {
            Direction::Outgoing => "source = ?1",
            Direction::Incoming => "target = ?1",
            Direction::Both => "(source = ?1 OR target = ?1)",
        };
        let sql = format!(
            "SELECT source, target, relation_type, properties FROM relations
             WHERE {}
             ORDER BY source, relation_type, target
             LIMIT ?2 OFFSET ?3",
            filter
        );

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let relations = stmt
                    .query_map(
                        params![name, page.limit as i64, page.offset as i64],
                        relation_from_row,
                    )?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(relations)
            })
            .await
            .map_err(store_err("list_relations"))
    }

    async fn run_query(
        &self,
        dialect: QueryDialect,
        text: &str,
        params: &Metadata,
    ) -> Result<QueryResult, StoreError> {
        if dialect != QueryDialect::Sql {
            return Err(StoreError::UnsupportedDialect(dialect));
        }

        let sql = text.to_string();
        let params = params.clone();
        let context = sql.clone();
        let outcome = self
            .conn
            .call(move |conn| Ok(execute_raw(conn, &sql, &params)))
            .await
            .map_err(store_err("run_query"))?;

        outcome.map_err(|e| StoreError::query(QueryDialect::Sql, &context, e))
    }

    async fn fetch_schema(&self) -> Result<Option<GraphSchema>, StoreError> {
        self.conn
            .call(|conn| Ok(Some(introspect_schema(conn)?)))
            .await
            .map_err(store_err("fetch_schema"))
    }

    async fn search_text(
        &self,
        query: &str,
        mode: TextMatch,
        limit: usize,
    ) -> Result<Vec<ScoredEntity>, StoreError> {
        let query = query.to_string();
        self.conn
            .call(move |conn| {
                let results = match mode {
                    TextMatch::Exact => exact_search(conn, &query, limit)?,
                    TextMatch::Fulltext => fulltext_search(conn, &query, limit)?,
                };
                Ok(results)
            })
            .await
            .map_err(store_err("search_text"))
    }

    async fn find_entities(
        &self,
        filter: &Metadata,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let filter = filter.clone();
        self.conn
            .call(move |conn| Ok(filter_entities(conn, &filter, limit)?))
            .await
            .map_err(store_err("find_entities"))
    }

    async fn list_entities(&self, page: Page) -> Result<Vec<Entity>, StoreError> {
        let sql = format!(
            "SELECT {} FROM entities ORDER BY name LIMIT ?1 OFFSET ?2",
            ENTITY_COLUMNS
        );
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let entities = stmt
                    .query_map(
                        params![page.limit as i64, page.offset as i64],
                        entity_from_row,
                    )?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entities)
            })
            .await
            .map_err(store_err("list_entities"))
    }

    async fn find_relations(
        &self,
        filter: &RelationFilter,
        limit: usize,
    ) -> Result<Vec<Relation>, StoreError> {
        let filter = filter.clone();
        self.conn
            .call(move |conn| Ok(filter_relations(conn, &filter, limit)?))
            .await
            .map_err(store_err("find_relations"))
    }

    async fn upsert_embedding(&self, name: &str, vector: &[f32]) -> Result<(), StoreError> {
        let name = name.to_string();
        let encoded = serde_json::to_string(vector)?;
        let updated = self
            .conn
            .call(move |conn| {
                let updated = conn.execute(
                    "UPDATE entities SET embedding = ?2 WHERE name = ?1",
                    params![name, encoded],
                )?;
                Ok(updated)
            })
            .await
            .map_err(store_err("upsert_embedding"))?;

        if updated == 0 {
            return Err(StoreError::InvalidRequest(
                "cannot store an embedding for a missing entity".to_string(),
            ));
        }
        Ok(())
    }

    async fn entity_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>, StoreError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name, embedding FROM entities
                     WHERE embedding IS NOT NULL ORDER BY name",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        let name: String = row.get(0)?;
                        let encoded: String = row.get(1)?;
                        Ok((name, encoded))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                let mut embeddings = Vec::with_capacity(rows.len());
                for (name, encoded) in rows {
                    match serde_json::from_str::<Vec<f32>>(&encoded) {
                        Ok(vector) => embeddings.push((name, vector)),
                        Err(e) => warn!(entity = %name, error = %e, "Skipping unreadable embedding"),
                    }
                }
                Ok(embeddings)
            })
            .await
            .map_err(store_err("entity_embeddings"))
    }

    async fn status(&self) -> StoreStatus {
        let check = self
            .conn
            .call(|conn| Ok(conn.query_row("SELECT count(*) FROM entities", [], |row| row.get::<_, i64>(0))?))
            .await;

        let (availability, detail) = match check {
            Ok(count) => (Availability::Available, Some(format!("{} entities", count))),
            Err(e) => (Availability::Unavailable, Some(e.to_string())),
        };

        StoreStatus {
            backend: self.id().to_string(),
            availability,
            dialects: DIALECTS.to_vec(),
            detail,
        }
    }

    async fn close(&self) -> Result<(), StoreError> {
        debug!("Closing SQLite graph store");
        self.conn
            .clone()
            .close()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}
