//! Raw SQL execution and schema introspection.

use rusqlite::Connection;

use graphmem_protocols::{GraphSchema, Metadata, QueryResult};

use super::store_rows::{json_to_sql, sql_to_json};

/// Execute one SQL statement with named parameters taken from `params`.
///
/// Parameter names may be given with or without their sigil (`:`, `@`, `$`);
/// bare names bind to `:name`. Statements without result columns report the
/// number of affected rows.
pub(crate) fn execute_raw(
    conn: &Connection,
    sql: &str,
    params: &Metadata,
) -> Result<QueryResult, String> {
    let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;

    for (name, value) in params {
        let placeholder = if name.starts_with([':', '@', '$']) {
            name.clone()
        } else {
            format!(":{}", name)
        };
        let idx = stmt
            .parameter_index(&placeholder)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("query has no parameter named {}", placeholder))?;
        stmt.raw_bind_parameter(idx, json_to_sql(value))
            .map_err(|e| e.to_string())?;
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    if columns.is_empty() {
        let affected = stmt.raw_execute().map_err(|e| e.to_string())?;
        return Ok(QueryResult {
            rows: vec![serde_json::json!({ "rows_affected": affected })],
        });
    }

    let mut rows = stmt.raw_query();
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| e.to_string())? {
        let mut record = serde_json::Map::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let value = row.get_ref(i).map_err(|e| e.to_string())?;
            record.insert(column.clone(), sql_to_json(value));
        }
        out.push(serde_json::Value::Object(record));
    }

    Ok(QueryResult { rows: out })
}

pub(crate) fn introspect_schema(conn: &Connection) -> Result<GraphSchema, rusqlite::Error> {
    Ok(GraphSchema {
        entity_types: column_values(
            conn,
            "SELECT DISTINCT entity_type FROM entities ORDER BY 1",
        )?,
        relation_types: column_values(
            conn,
            "SELECT DISTINCT relation_type FROM relations ORDER BY 1",
        )?,
        entity_property_keys: column_values(
            conn,
            "SELECT DISTINCT j.key FROM entities, json_each(entities.metadata) AS j ORDER BY 1",
        )?,
        relation_property_keys: column_values(
            conn,
            "SELECT DISTINCT j.key FROM relations, json_each(relations.properties) AS j ORDER BY 1",
        )?,
    })
}

fn column_values(conn: &Connection, sql: &str) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(sql)?;
    let values = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}
