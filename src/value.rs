//! Attribute values and the "unknown after apply" marker.
//!
//! Plans and states are plain [`serde_json::Value`]s. A value that will only be
//! known once the remote API has been called is encoded as the string
//! [`UNKNOWN_VALUE`], the same marker Terraform's SDK uses for unknown
//! variables.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Marker for a value that is unknown until apply.
pub const UNKNOWN_VALUE: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// The unknown marker as a JSON value.
pub fn unknown() -> Value {
    Value::String(UNKNOWN_VALUE.to_string())
}

/// Whether a value is the unknown marker.
pub fn is_unknown(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == UNKNOWN_VALUE)
}

/// Whether a value is null or unknown, i.e. not specified by the user.
pub fn is_null_or_unknown(value: &Value) -> bool {
    value.is_null() || is_unknown(value)
}

/// Whether a value, or anything nested inside it, is unknown.
pub fn contains_unknown(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().any(contains_unknown),
        Value::Object(map) => map.values().any(contains_unknown),
        v => is_unknown(v),
    }
}

/// Replace every unknown marker with null.
pub fn strip_unknown(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(strip_unknown).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), strip_unknown(v)))
                .collect(),
        ),
        v if is_unknown(v) => Value::Null,
        v => v.clone(),
    }
}

/// Decode a plan or state into a typed model, treating unknowns as null.
pub fn from_state<T: DeserializeOwned>(value: &Value) -> Result<T, ProviderError> {
    Ok(serde_json::from_value(strip_unknown(value))?)
}

/// Read a string attribute, ignoring null and unknown values.
pub fn get_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .filter(|v| !is_unknown(v))
        .and_then(Value::as_str)
}

/// Read a required string attribute.
pub fn require_str<'a>(value: &'a Value, key: &str) -> Result<&'a str, ProviderError> {
    get_str(value, key)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::InvalidRequest(format!("missing attribute '{}'", key)))
}

/// Set a top-level attribute on an object value, converting null roots into objects.
pub fn set_attr(value: &mut Value, key: &str, attr: Value) {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    if let Value::Object(map) = value {
        map.insert(key.to_string(), attr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_unknown_marker() {
        assert!(is_unknown(&unknown()));
        assert!(!is_unknown(&json!("something")));
        assert!(!is_unknown(&Value::Null));
        assert!(is_null_or_unknown(&Value::Null));
        assert!(is_null_or_unknown(&unknown()));
        assert!(!is_null_or_unknown(&json!(false)));
    }

    #[test]
    fn test_contains_unknown() {
        assert!(contains_unknown(&json!({"a": [1, UNKNOWN_VALUE]})));
        assert!(!contains_unknown(&json!({"a": [1, 2], "b": null})));
    }

    #[test]
    fn test_strip_unknown_nested() {
        let value = json!({"id": UNKNOWN_VALUE, "tags": [UNKNOWN_VALUE, "a"], "name": "x"});
        assert_eq!(
            strip_unknown(&value),
            json!({"id": null, "tags": [null, "a"], "name": "x"})
        );
    }

    #[test]
    fn test_from_state_ignores_unknown() {
        #[derive(Deserialize)]
        struct Model {
            id: Option<String>,
            count: Option<i64>,
        }

        let model: Model = from_state(&json!({"id": UNKNOWN_VALUE, "count": 3})).unwrap();
        assert!(model.id.is_none());
        assert_eq!(model.count, Some(3));
    }

    #[test]
    fn test_require_str() {
        let value = json!({"id": "abc", "empty": "", "later": UNKNOWN_VALUE});
        assert_eq!(require_str(&value, "id").unwrap(), "abc");
        assert!(require_str(&value, "empty").is_err());
        assert!(require_str(&value, "later").is_err());
        assert!(require_str(&value, "missing").is_err());
    }

    #[test]
    fn test_set_attr_on_null() {
        let mut value = Value::Null;
        set_attr(&mut value, "id", json!("1"));
        assert_eq!(value, json!({"id": "1"}));
    }
}
