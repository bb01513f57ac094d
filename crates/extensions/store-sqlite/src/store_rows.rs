//! Row mapping and value conversion helpers.

use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, Row};
use serde::Serialize;

use graphmem_protocols::{Entity, Metadata, Relation};

pub(crate) const ENTITY_COLUMNS: &str =
    "name, entity_type, metadata, observations, last_observation_update";

pub(crate) fn entity_from_row(row: &Row<'_>) -> Result<Entity, rusqlite::Error> {
    let metadata_str: String = row.get(2)?;
    let observations_str: String = row.get(3)?;

    Ok(Entity {
        name: row.get(0)?,
        entity_type: row.get(1)?,
        metadata: serde_json::from_str(&metadata_str).unwrap_or_default(),
        observations: serde_json::from_str(&observations_str).unwrap_or_default(),
        last_observation_update: row.get(4)?,
    })
}

pub(crate) fn relation_from_row(row: &Row<'_>) -> Result<Relation, rusqlite::Error> {
    let properties_str: String = row.get(3)?;
    let properties: Metadata = serde_json::from_str(&properties_str).unwrap_or_default();

    Ok(Relation {
        source: row.get(0)?,
        target: row.get(1)?,
        relation_type: row.get(2)?,
        properties,
    })
}

pub(crate) fn load_entity(conn: &Connection, name: &str) -> Result<Option<Entity>, rusqlite::Error> {
    let sql = format!("SELECT {} FROM entities WHERE name = ?1", ENTITY_COLUMNS);
    match conn.query_row(&sql, [name], entity_from_row) {
        Ok(entity) => Ok(Some(entity)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub(crate) fn to_json_text<T: Serialize + ?Sized>(value: &T) -> Result<String, rusqlite::Error> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Convert a JSON parameter into a bindable SQLite value. Arrays and objects
/// are bound as their JSON text.
pub(crate) fn json_to_sql(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Integer(i64::from(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Real(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

/// Convert a SQLite column value into JSON.
pub(crate) fn sql_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Value::from(f),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => serde_json::Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}
