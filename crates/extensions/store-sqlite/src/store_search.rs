//! Text search and attribute filtering.

use rusqlite::Connection;

use graphmem_protocols::{Metadata, Relation, RelationFilter, SUBGRAPH_TYPE, ScoredEntity};

use super::store_rows::{ENTITY_COLUMNS, entity_from_row, json_to_sql, relation_from_row};

pub(crate) fn exact_search(
    conn: &Connection,
    query: &str,
    limit: usize,
) -> Result<Vec<ScoredEntity>, rusqlite::Error> {
    let sql = format!(
        "SELECT {} FROM entities
         WHERE name = ?1 COLLATE NOCASE AND entity_type <> ?3
         ORDER BY name LIMIT ?2",
        ENTITY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let entities = stmt
        .query_map(
            rusqlite::params![query.trim(), limit as i64, SUBGRAPH_TYPE],
            entity_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entities
        .into_iter()
        .map(|entity| ScoredEntity { entity, score: 1.0 })
        .collect())
}

pub(crate) fn fulltext_search(
    conn: &Connection,
    query: &str,
    limit: usize,
) -> Result<Vec<ScoredEntity>, rusqlite::Error> {
    let Some(match_expr) = sanitize_fts_query(query) else {
        return Ok(Vec::new());
    };

    let sql = format!(
        "SELECT {}, bm25(entities_fts) AS score
         FROM entities e
         JOIN entities_fts ON e.rowid = entities_fts.rowid
         WHERE entities_fts MATCH ?1 AND e.entity_type <> ?3
         ORDER BY score, e.name
         LIMIT ?2",
        prefixed_columns("e")
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params![match_expr, limit as i64, SUBGRAPH_TYPE])?;
    let mut results = Vec::new();

    while let Some(row) = rows.next()? {
        let entity = entity_from_row(row)?;
        let bm25: f64 = row.get(5)?;
        // bm25 is negative, lower is better; squash into (0, 1)
        let score = (1.0 / (1.0 + bm25.exp())) as f32;
        results.push(ScoredEntity { entity, score });
    }

    Ok(results)
}

/// Names of entities matching every filter entry exactly. The key `type`
/// matches the entity type; other keys match metadata values.
pub(crate) fn filter_entities(
    conn: &Connection,
    filter: &Metadata,
    limit: usize,
) -> Result<Vec<String>, rusqlite::Error> {
    let mut keys: Vec<&String> = filter.keys().collect();
    keys.sort();

    let mut clauses = Vec::with_capacity(keys.len());
    let mut values = Vec::with_capacity(keys.len() + 1);
    for (i, key) in keys.iter().enumerate() {
        let idx = i + 1;
        if key.as_str() == "type" {
            clauses.push(format!("entity_type = ?{}", idx));
        } else {
            let path = format!("$.\"{}\"", key.replace('"', "\\\""));
            clauses.push(format!(
                "json_extract(metadata, '{}') = ?{}",
                path.replace('\'', "''"),
                idx
            ));
        }
        values.push(json_to_sql(&filter[*key]));
    }
    values.push(rusqlite::types::Value::Integer(limit as i64));

    let where_clause = if clauses.is_empty() {
        "1 = 1".to_string()
    } else {
        clauses.join(" AND ")
    };
    let sql = format!(
        "SELECT name FROM entities WHERE {} ORDER BY name LIMIT ?{}",
        where_clause,
        values.len()
    );

    let mut stmt = conn.prepare(&sql)?;
    let names = stmt
        .query_map(rusqlite::params_from_iter(values), |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

/// Relations equal to every set field of `filter`.
pub(crate) fn filter_relations(
    conn: &Connection,
    filter: &RelationFilter,
    limit: usize,
) -> Result<Vec<Relation>, rusqlite::Error> {
    let mut clauses = Vec::new();
    let mut values: Vec<rusqlite::types::Value> = Vec::new();
    for (column, value) in [
        ("source", &filter.source),
        ("target", &filter.target),
        ("relation_type", &filter.relation_type),
    ] {
        if let Some(value) = value {
            values.push(rusqlite::types::Value::Text(value.clone()));
            clauses.push(format!("{} = ?{}", column, values.len()));
        }
    }
    values.push(rusqlite::types::Value::Integer(limit as i64));

    let where_clause = if clauses.is_empty() {
        "1 = 1".to_string()
    } else {
        clauses.join(" AND ")
    };
    let sql = format!(
        "SELECT source, target, relation_type, properties FROM relations
         WHERE {}
         ORDER BY source, relation_type, target
         LIMIT ?{}",
        where_clause,
        values.len()
    );

    let mut stmt = conn.prepare(&sql)?;
    let relations = stmt
        .query_map(rusqlite::params_from_iter(values), relation_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(relations)
}

/// Quote each whitespace-separated term and OR them together, so user input
/// never reaches the FTS5 query grammar.
fn sanitize_fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|term| term.replace('"', ""))
        .filter(|term| !term.is_empty())
        .map(|term| format!("\"{}\"", term))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

fn prefixed_columns(alias: &str) -> String {
    ENTITY_COLUMNS
        .split(", ")
        .map(|column| format!("{}.{}", alias, column))
        .collect::<Vec<_>>()
        .join(", ")
}
