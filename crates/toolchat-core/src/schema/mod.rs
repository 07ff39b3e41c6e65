//! Schema normalization for function declarations
//!
//! Tool servers publish full JSON Schema; function-calling APIs accept only a
//! subset of it. [`normalize`] prunes a schema down to that subset:
//!
//! - `additionalProperties`, `$schema` and `title` keys are dropped
//!   (property *names* under `properties` are never filtered)
//! - keys whose value is `null` are dropped, as is `"type": "null"`
//! - `properties` and `items` are normalized recursively; properties that
//!   normalize to nothing are removed
//! - other nested objects and arrays are kept only if non-empty afterwards
//! - an object with surviving `properties` but no `type` gets `"type": "OBJECT"`
//!
//! An empty result is `None`, meaning "no parameters". Normalization is pure
//! and idempotent.

use serde_json::{Map, Value};

use crate::logging::{Logger, NoOpLogger};

/// Keys the function-declaration format rejects
const DISALLOWED_KEYS: [&str; 3] = ["additionalProperties", "$schema", "title"];

/// Type assigned when `properties` survive but `type` does not
pub const OBJECT_TYPE: &str = "OBJECT";

/// Normalize a tool parameter schema.
pub fn normalize(schema: &Value) -> Option<Value> {
    normalize_logged(schema, &NoOpLogger)
}

/// Same as [`normalize`], reporting dropped `type: null` keys to `logger`.
pub fn normalize_logged(schema: &Value, logger: &dyn Logger) -> Option<Value> {
    match schema {
        Value::Null => None,
        Value::Object(map) => clean_object(map, logger).map(Value::Object),
        other => Some(other.clone()),
    }
}

fn clean_object(schema: &Map<String, Value>, logger: &dyn Logger) -> Option<Map<String, Value>> {
    let mut cleaned = Map::new();

    for (key, value) in schema {
        if DISALLOWED_KEYS.contains(&key.as_str()) || value.is_null() {
            continue;
        }

        if key == "type" && value.as_str() == Some("null") {
            logger.debug("[Schema] Dropping unsupported 'type: null'");
            continue;
        }

        match (key.as_str(), value) {
            ("properties", Value::Object(props)) => {
                let kept: Map<String, Value> = props
                    .iter()
                    .filter_map(|(name, prop)| {
                        normalize_logged(prop, logger).map(|p| (name.clone(), p))
                    })
                    .collect();
                if !kept.is_empty() {
                    cleaned.insert(key.clone(), Value::Object(kept));
                }
            }
            (_, Value::Object(nested)) => {
                // `items` and any other nested schema share the same rule
                if let Some(inner) = clean_object(nested, logger) {
                    cleaned.insert(key.clone(), Value::Object(inner));
                }
            }
            (_, Value::Array(items)) => {
                let kept: Vec<Value> = items
                    .iter()
                    .filter_map(|item| match item {
                        Value::Object(obj) => clean_object(obj, logger).map(Value::Object),
                        Value::Null => None,
                        other => Some(other.clone()),
                    })
                    .collect();
                if !kept.is_empty() {
                    cleaned.insert(key.clone(), Value::Array(kept));
                }
            }
            _ => {
                cleaned.insert(key.clone(), value.clone());
            }
        }
    }

    if cleaned.contains_key("properties") && !cleaned.contains_key("type") {
        cleaned.insert("type".to_string(), Value::String(OBJECT_TYPE.to_string()));
    }

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLogger;
    use serde_json::json;

    fn samples() -> Vec<Value> {
        vec![
            json!(null),
            json!({}),
            json!({"title": "Nothing", "$schema": "x", "additionalProperties": false}),
            json!({"type": "OBJECT"}),
            json!({"type": "object", "properties": {}}),
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Directory", "default": null},
                    "depth": {"type": ["integer", "null"]},
                    "ghost": {"type": "null"},
                    "title": {"type": "string", "title": "A property called title"}
                },
                "required": ["path"],
                "additionalProperties": false
            }),
            json!({
                "properties": {
                    "tags": {"type": "array", "items": {"type": "string", "title": "Tag"}},
                    "opts": {"anyOf": [{"type": "string"}, {"type": "null"}, {}]}
                }
            }),
            json!({"items": {"title": "only a title"}, "type": "array"}),
            json!({"enum": [null, "a", "b"], "nested": {"deep": {"title": "gone"}}}),
            json!({"anyOf": [[], {"type": "null"}], "minItems": 0}),
            json!("string-schema"),
        ]
    }

    #[test]
    fn test_drops_disallowed_keys_and_nulls() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": "Args",
            "type": "object",
            "additionalProperties": false,
            "description": null,
            "properties": {"path": {"type": "string", "title": "Path"}}
        });

        assert_eq!(
            normalize(&schema),
            Some(json!({"type": "object", "properties": {"path": {"type": "string"}}}))
        );
    }

    #[test]
    fn test_type_null_is_dropped_and_logged() {
        let logger = MemoryLogger::new();
        let schema = json!({"properties": {"nothing": {"type": "null"}, "x": {"type": "integer"}}});

        let result = normalize_logged(&schema, &logger).unwrap();
        assert_eq!(result, json!({"type": "OBJECT", "properties": {"x": {"type": "integer"}}}));
        assert!(logger.contains("type: null"));
    }

    #[test]
    fn test_property_names_matching_disallowed_keys_survive() {
        let schema = json!({"type": "object", "properties": {"title": {"type": "string"}}});
        let result = normalize(&schema).unwrap();
        assert_eq!(result["properties"]["title"], json!({"type": "string"}));
    }

    #[test]
    fn test_infers_object_type_when_properties_survive() {
        let schema = json!({"properties": {"a": {"type": "string"}}});
        assert_eq!(normalize(&schema).unwrap()["type"], json!("OBJECT"));
    }

    #[test]
    fn test_no_inference_when_all_properties_pruned() {
        let schema = json!({"properties": {"a": {"title": "x"}, "b": {"type": "null"}}});
        assert_eq!(normalize(&schema), None);
    }

    #[test]
    fn test_explicit_object_type_kept_without_properties() {
        let schema = json!({"type": "OBJECT", "properties": {"gone": {"title": "x"}}});
        assert_eq!(normalize(&schema), Some(json!({"type": "OBJECT"})));
    }

    #[test]
    fn test_items_recursion() {
        let schema = json!({"type": "array", "items": {"type": "string", "title": "Item", "additionalProperties": true}});
        assert_eq!(normalize(&schema), Some(json!({"type": "array", "items": {"type": "string"}})));

        let empty_items = json!({"type": "array", "items": {"title": "Item"}});
        assert_eq!(normalize(&empty_items), Some(json!({"type": "array"})));
    }

    #[test]
    fn test_arrays_drop_nulls_and_empty_objects() {
        let schema = json!({"anyOf": [{"type": "string"}, {}, null, {"title": "x"}], "enum": [null]});
        assert_eq!(normalize(&schema), Some(json!({"anyOf": [{"type": "string"}]})));
    }

    #[test]
    fn test_empty_schema_is_absent() {
        assert_eq!(normalize(&json!({})), None);
        assert_eq!(normalize(&json!(null)), None);
        assert_eq!(normalize(&json!({"title": "t", "$schema": "s"})), None);
    }

    #[test]
    fn test_leaf_values_pass_through() {
        assert_eq!(normalize(&json!(true)), Some(json!(true)));
        assert_eq!(normalize(&json!("s")), Some(json!("s")));
    }

    #[test]
    fn test_idempotent() {
        for sample in samples() {
            let once = normalize(&sample);
            let twice = once.as_ref().and_then(normalize);
            assert_eq!(once, twice, "not idempotent for {}", sample);
        }
    }

    fn assert_clean(value: &Value) {
        if let Value::Object(map) = value {
            assert_ne!(map.get("type"), Some(&json!("null")));
            if map.contains_key("properties") {
                assert!(map.contains_key("type"));
            }
            for (key, v) in map {
                assert!(!v.is_null(), "null value under '{}'", key);
                assert_clean(v);
            }
        } else if let Value::Array(items) = value {
            items.iter().for_each(assert_clean);
        }
    }

    #[test]
    fn test_output_never_contains_nulls_or_null_type() {
        for sample in samples() {
            if let Some(out) = normalize(&sample) {
                assert_clean(&out);
            }
        }
    }
}
