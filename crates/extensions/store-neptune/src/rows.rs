//! Normalisation of openCypher rows into graph records.

use serde_json::{Map, Value};

use graphmem_protocols::error::StoreError;
use graphmem_protocols::{
    Entity, Metadata, RESERVED_PROPERTY_KEYS, REVISION_PROPERTY, Relation, UNKNOWN_TYPE,
};

/// Edge properties owned by the store.
const EDGE_KEYS: &[&str] = &["type", "created_at", "updated_at"];

pub(crate) fn is_node_key(key: &str) -> bool {
    RESERVED_PROPERTY_KEYS.contains(&key)
}

pub(crate) fn is_edge_key(key: &str) -> bool {
    EDGE_KEYS.contains(&key)
}

/// Drop keys the store manages itself from a caller-supplied map.
pub(crate) fn strip_keys(map: &Metadata, reserved: fn(&str) -> bool) -> Metadata {
    map.iter()
        .filter(|(k, _)| !reserved(k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn field<'a>(row: &'a Value, name: &str) -> Result<&'a Value, StoreError> {
    row.get(name)
        .ok_or_else(|| StoreError::Serialization(format!("result row has no '{}' column", name)))
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, StoreError> {
    value
        .as_object()
        .ok_or_else(|| StoreError::Serialization(format!("{} is not a property map", what)))
}

pub(crate) fn string_field(row: &Value, name: &str) -> Result<String, StoreError> {
    field(row, name)?
        .as_str()
        .map(String::from)
        .ok_or_else(|| StoreError::Serialization(format!("column '{}' is not a string", name)))
}

/// Lists are stored JSON-encoded so backends without list properties work.
pub(crate) fn decode_list<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Result<Vec<T>, StoreError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(text)) => Ok(serde_json::from_str(text)?),
        Some(other) => Ok(serde_json::from_value(other.clone())?),
    }
}

/// Entity plus its revision, read from a `props` column.
pub(crate) fn entity_from_row(row: &Value) -> Result<(Entity, i64), StoreError> {
    let props = as_object(field(row, "props")?, "node")?;

    let name = props
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Serialization("node has no name".to_string()))?;
    let entity_type = props
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_TYPE);

    let mut entity = Entity::new(name, entity_type);
    entity.observations = decode_list(props.get("observations"))?;
    entity.last_observation_update = props
        .get("last_observation_update")
        .and_then(Value::as_str)
        .map(String::from);
    entity.metadata = props
        .iter()
        .filter(|(k, _)| !is_node_key(k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let revision = props.get(REVISION_PROPERTY).and_then(Value::as_i64).unwrap_or(0);
    Ok((entity, revision))
}

pub(crate) fn relation_from_row(row: &Value) -> Result<Relation, StoreError> {
    let props = as_object(field(row, "props")?, "edge")?;
    let relation_type = props
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Serialization("edge has no type".to_string()))?;

    let properties: Metadata = props
        .iter()
        .filter(|(k, _)| !is_edge_key(k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(Relation::new(
        string_field(row, "source")?,
        string_field(row, "target")?,
        relation_type,
    )
    .with_properties(properties))
}
