//! Input checks applied before any store call.

use graphmem_protocols::{
    CONTAINS, CONTAINS_SUBGRAPH, MemoryError, Metadata, ORIGINAL_RELATION_TYPE,
    Observation, RESERVED_PROPERTY_KEYS, SUBGRAPH_TYPE, is_storable_value,
};

/// Relation property names the engine or the adapters own.
const RESERVED_RELATION_KEYS: &[&str] = &["type", "created_at", "updated_at", ORIGINAL_RELATION_TYPE];

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), MemoryError> {
    if value.trim().is_empty() {
        return Err(MemoryError::validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

pub(crate) fn validate_entity_type(entity_type: &str) -> Result<(), MemoryError> {
    require_non_empty("entity type", entity_type)?;
    if entity_type == SUBGRAPH_TYPE {
        return Err(MemoryError::validation(format!(
            "entity type '{}' is reserved for sub-graph markers",
            SUBGRAPH_TYPE
        )));
    }
    Ok(())
}

pub(crate) fn validate_relation_type(relation_type: &str) -> Result<(), MemoryError> {
    require_non_empty("relation type", relation_type)?;
    if relation_type == CONTAINS || relation_type == CONTAINS_SUBGRAPH {
        return Err(MemoryError::validation(format!(
            "relation type '{}' is reserved for sub-graph maintenance",
            relation_type
        )));
    }
    Ok(())
}

fn validate_map(map: &Metadata, what: &str, reserved: &[&str]) -> Result<(), MemoryError> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    for key in keys {
        if key.trim().is_empty() {
            return Err(MemoryError::validation(format!("{} keys must not be empty", what)));
        }
        if reserved.contains(&key.as_str()) {
            return Err(MemoryError::validation(format!(
                "{} key '{}' is reserved",
                what, key
            )));
        }
        if !is_storable_value(&map[key]) {
            return Err(MemoryError::validation(format!(
                "{} '{}' must be a scalar or an array of scalars",
                what, key
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_metadata(metadata: &Metadata) -> Result<(), MemoryError> {
    validate_map(metadata, "metadata", RESERVED_PROPERTY_KEYS)
}

pub(crate) fn validate_properties(properties: &Metadata) -> Result<(), MemoryError> {
    validate_map(properties, "relation property", RESERVED_RELATION_KEYS)
}

/// Filter values for `find_entities`. `type` is allowed here and means the
/// entity type.
pub(crate) fn validate_filter(filter: &Metadata) -> Result<(), MemoryError> {
    if filter.is_empty() {
        return Err(MemoryError::validation("filter must name at least one key"));
    }
    validate_map(filter, "filter", &[])
}

/// Parse every entry up front so an invalid one rejects the whole write.
pub(crate) fn parse_observations(raw: &[String]) -> Result<Vec<Observation>, MemoryError> {
    raw.iter()
        .map(|entry| Observation::parse(entry).map_err(|e| MemoryError::validation(e.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, serde_json::Value)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_blank_names_rejected() {
        assert!(require_non_empty("entity name", "Ada").is_ok());
        let err = require_non_empty("entity name", "  ").unwrap_err();
        assert_eq!(err.to_string(), "Validation error: entity name must not be empty");
    }

    #[test]
    fn test_reserved_types() {
        assert!(validate_entity_type("Person").is_ok());
        assert!(validate_entity_type("Unknown").is_ok());
        assert!(validate_entity_type("SubGraph").is_err());
        assert!(validate_relation_type("WORKS_AT").is_ok());
        assert!(validate_relation_type("CONTAINS").is_err());
        assert!(validate_relation_type("CONTAINS_SUBGRAPH").is_err());
    }

    #[test]
    fn test_metadata_values() {
        assert!(validate_metadata(&map(&[("tags", json!(["a", 1, null]))])).is_ok());
        assert!(validate_metadata(&map(&[("nested", json!({"a": 1}))])).is_err());
        assert!(validate_metadata(&map(&[("grid", json!([[1, 2]]))])).is_err());
    }

    #[test]
    fn test_reserved_metadata_keys() {
        let err = validate_metadata(&map(&[("last_observation_update", json!("x"))])).unwrap_err();
        assert!(err.to_string().contains("reserved"));
        assert!(validate_metadata(&map(&[("name", json!("x"))])).is_err());
        assert!(validate_metadata(&map(&[("_graphmem_revision", json!(1))])).is_err());
    }

    #[test]
    fn test_revision_is_ordinary_metadata() {
        assert!(validate_metadata(&map(&[("revision", json!("v2.3"))])).is_ok());
    }

    #[test]
    fn test_relation_property_keys() {
        assert!(validate_properties(&map(&[("since", json!(2020))])).is_ok());
        assert!(validate_properties(&map(&[("original_relation_type", json!("X"))])).is_err());
        assert!(validate_properties(&map(&[("type", json!("X"))])).is_err());
    }

    #[test]
    fn test_filter_allows_type() {
        assert!(validate_filter(&map(&[("type", json!("Person"))])).is_ok());
        assert!(validate_filter(&Metadata::new()).is_err());
    }

    #[test]
    fn test_one_bad_observation_rejects_all() {
        let raw = vec![
            "2026-01-05 14:00 | Opened office".to_string(),
            "yesterday | Closed office".to_string(),
        ];
        let err = parse_observations(&raw).unwrap_err();
        assert!(matches!(err, MemoryError::Validation(_)));
        assert!(err.to_string().contains("yesterday"));
    }
}
