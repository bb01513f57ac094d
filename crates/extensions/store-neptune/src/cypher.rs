//! openCypher statements issued by the store.

/// Read an entity together with its revision counter.
pub(crate) const FETCH_ENTITY: &str = "\
MATCH (e:Memory {name: $name})
RETURN properties(e) AS props";

/// Compare-and-set write of one entity. Returns no row when another writer
/// bumped the revision since it was read.
pub(crate) const WRITE_ENTITY: &str = "\
MERGE (e:Memory {name: $name})
ON CREATE SET e._graphmem_revision = 0, e.created_at = $now
WITH e
WHERE coalesce(e._graphmem_revision, 0) = $revision
SET e.type = $type,
    e.observations = $observations,
    e.last_observation_update = $last_update,
    e.updated_at = $now,
    e._graphmem_revision = $revision + 1
SET e += $metadata
RETURN properties(e) AS props";

pub(crate) const ENTITY_EXISTS: &str = "\
MATCH (e:Memory)
WHERE e.name IN $names
RETURN e.name AS name";

pub(crate) const UPSERT_RELATION: &str = "\
MATCH (a:Memory {name: $source}), (b:Memory {name: $target})
MERGE (a)-[r:RELATED_TO {type: $type}]->(b)
ON CREATE SET r.created_at = $now
SET r += $properties, r.updated_at = $now
RETURN a.name AS source, b.name AS target, properties(r) AS props";

pub(crate) const DELETE_ENTITY: &str = "\
MATCH (e:Memory {name: $name})
WITH e, e.name AS name
DETACH DELETE e
RETURN name";

pub(crate) const DELETE_RELATION: &str = "\
MATCH (:Memory {name: $source})-[r:RELATED_TO {type: $type}]->(:Memory {name: $target})
WITH r, r.type AS type
DELETE r
RETURN type";

pub(crate) const FETCH_RELATION: &str = "\
MATCH (a:Memory {name: $source})-[r:RELATED_TO {type: $type}]->(b:Memory {name: $target})
RETURN a.name AS source, b.name AS target, properties(r) AS props";

pub(crate) const LIST_OUTGOING: &str = "\
MATCH (a:Memory {name: $name})-[r:RELATED_TO]->(b:Memory)
WITH a, r, b ORDER BY a.name, r.type, b.name SKIP $offset LIMIT $limit
RETURN a.name AS source, b.name AS target, properties(r) AS props";

pub(crate) const LIST_INCOMING: &str = "\
MATCH (a:Memory)-[r:RELATED_TO]->(b:Memory {name: $name})
WITH a, r, b ORDER BY a.name, r.type, b.name SKIP $offset LIMIT $limit
RETURN a.name AS source, b.name AS target, properties(r) AS props";

pub(crate) const LIST_BOTH: &str = "\
MATCH (a:Memory)-[r:RELATED_TO]->(b:Memory)
WHERE a.name = $name OR b.name = $name
WITH a, r, b ORDER BY a.name, r.type, b.name SKIP $offset LIMIT $limit
RETURN a.name AS source, b.name AS target, properties(r) AS props";

pub(crate) const ENTITY_TYPES: &str = "\
MATCH (e:Memory)
RETURN DISTINCT e.type AS value";

pub(crate) const RELATION_TYPES: &str = "\
MATCH (:Memory)-[r:RELATED_TO]->(:Memory)
RETURN DISTINCT r.type AS value";

pub(crate) const ENTITY_KEYS: &str = "\
MATCH (e:Memory)
UNWIND keys(e) AS key
RETURN DISTINCT key AS value";

pub(crate) const RELATION_KEYS: &str = "\
MATCH (:Memory)-[r:RELATED_TO]->(:Memory)
UNWIND keys(r) AS key
RETURN DISTINCT key AS value";

pub(crate) const EXACT_SEARCH: &str = "\
MATCH (e:Memory)
WHERE toLower(e.name) = toLower($query) AND coalesce(e.type, '') <> $marker_type
WITH e ORDER BY e.name LIMIT $limit
RETURN properties(e) AS props";

/// Candidate rows for term matching; the store scores them by coverage.
pub(crate) const TERM_SEARCH: &str = "\
MATCH (e:Memory)
WHERE coalesce(e.type, '') <> $marker_type
  AND any(t IN $terms WHERE any(k IN keys(e)
    WHERE NOT k IN $skip_keys AND toLower(toString(e[k])) CONTAINS t))
WITH e ORDER BY e.name LIMIT $limit
RETURN properties(e) AS props";

pub(crate) const LIST_ENTITIES: &str = "\
MATCH (e:Memory)
WITH e ORDER BY e.name SKIP $offset LIMIT $limit
RETURN properties(e) AS props";

/// Null parameters match any value.
pub(crate) const FIND_RELATIONS: &str = "\
MATCH (a:Memory)-[r:RELATED_TO]->(b:Memory)
WHERE ($source IS NULL OR a.name = $source)
  AND ($target IS NULL OR b.name = $target)
  AND ($type IS NULL OR r.type = $type)
WITH a, r, b ORDER BY a.name, r.type, b.name LIMIT $limit
RETURN a.name AS source, b.name AS target, properties(r) AS props";

pub(crate) const SET_EMBEDDING: &str = "\
MATCH (e:Memory {name: $name})
SET e.embedding = $embedding
RETURN e.name AS name";

pub(crate) const ENTITY_EMBEDDINGS: &str = "\
MATCH (e:Memory)
WHERE e.embedding IS NOT NULL
WITH e ORDER BY e.name
RETURN e.name AS name, e.embedding AS embedding";

/// Build an exact-match filter over `type` and metadata keys. Keys are
/// bound as backtick-quoted property names, values as `$p0, $p1, ...`.
pub(crate) fn find_entities_query(keys: &[&str]) -> String {
    let clauses: Vec<String> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| format!("e.`{}` = $p{}", key.replace('`', "``"), i))
        .collect();
    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}\n", clauses.join(" AND "))
    };
    format!(
        "MATCH (e:Memory)\n{}WITH e ORDER BY e.name LIMIT $limit\nRETURN e.name AS name",
        where_clause
    )
}
