//! GraphSON unwrapping.
//!
//! Gremlin responses wrap every value as `{"@type": ..., "@value": ...}`.
//! [`unwrap_graphson`] strips those wrappers so callers see plain JSON.

use serde_json::{Map, Value};

/// Recursively replace typed GraphSON wrappers with their plain values.
pub fn unwrap_graphson(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(unwrap_graphson).collect()),
        Value::Object(mut object) => {
            let is_typed = object.len() == 2
                && object.contains_key("@type")
                && object.contains_key("@value");
            if !is_typed {
                return Value::Object(
                    object
                        .into_iter()
                        .map(|(k, v)| (k, unwrap_graphson(v)))
                        .collect(),
                );
            }

            let type_name = object
                .remove("@type")
                .and_then(|t| t.as_str().map(String::from))
                .unwrap_or_default();
            let inner = object.remove("@value").unwrap_or(Value::Null);

            match type_name.as_str() {
                "g:Map" => unwrap_map(inner),
                _ => unwrap_graphson(inner),
            }
        }
        other => other,
    }
}

/// `g:Map` values are a flat `[k1, v1, k2, v2, ...]` list.
fn unwrap_map(inner: Value) -> Value {
    let Value::Array(items) = inner else {
        return unwrap_graphson(inner);
    };

    let mut map = Map::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let Some(key) = iter.next() {
        let value = iter.next().map(unwrap_graphson).unwrap_or(Value::Null);
        let key = match unwrap_graphson(key) {
            Value::String(s) => s,
            other => other.to_string(),
        };
        map.insert(key, value);
    }
    Value::Object(map)
}
