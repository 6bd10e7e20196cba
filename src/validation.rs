//! Configuration validation against a [`Schema`].
//!
//! Checks presence of required attributes, value types, nested attributes,
//! and the string validators attached to attributes. Values that are unknown
//! at validation time (they reference something not yet created) pass every
//! check; they are validated again once known.
//!
//! # Example
//!
//! ```
//! use polytomic_provider::schema::{Attribute, Schema, StringValidator};
//! use polytomic_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0().with_attribute(
//!     "name",
//!     Attribute::required_string().with_validator(StringValidator::ValidName),
//! );
//!
//! assert!(validate(&schema, &json!({"name": "Accounts"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": " Accounts"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("name".to_string()));
//! ```

use serde_json::Value;

use crate::names::valid_name;
use crate::schema::{
    Attribute, AttributeType, Diagnostic, NestedAttributes, NestingMode, Schema, StringValidator,
};
use crate::value::is_unknown;

/// Validate a configuration value against a schema.
///
/// Returns a list of diagnostics; an empty list means the value is valid.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    match value {
        Value::Object(_) | Value::Null => {
            validate_attributes(&schema.attributes, value, "", &mut diagnostics)
        },
        v if is_unknown(v) => {},
        v => diagnostics.push(
            Diagnostic::error("Expected object").with_detail(format!("Got {}", value_type_name(v))),
        ),
    }
    diagnostics
}

/// Validate a configuration value, returning the diagnostics as an error.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check a string against a single validator, returning the failure detail.
pub fn check_string(validator: &StringValidator, value: &str) -> Option<String> {
    match validator {
        StringValidator::ValidName => (!valid_name(value)).then(|| {
            "Name must not be empty or start or end with whitespace".to_string()
        }),
        StringValidator::OneOf(allowed) => (!allowed.iter().any(|a| a == value))
            .then(|| format!("Value must be one of: {}", allowed.join(", "))),
        StringValidator::Email => {
            let ok = value
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
            (!ok).then(|| format!("'{}' is not a valid email address", value))
        },
    }
}

fn validate_attributes(
    attributes: &std::collections::BTreeMap<String, Attribute>,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, attr) in attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, value.get(name), &attr_path, diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let value = match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
            return;
        },
        Some(v) if is_unknown(v) => return,
        Some(v) => v,
    };

    if attr.flags.is_computed_only() {
        diagnostics.push(
            Diagnostic::error(format!("Invalid configuration for '{}'", path))
                .with_detail("This attribute is computed and cannot be set")
                .with_attribute(path),
        );
        return;
    }

    if let Some(nested) = &attr.nested {
        validate_nested(nested, value, path, diagnostics);
        return;
    }

    validate_attribute_type(&attr.attr_type, value, path, diagnostics);

    // Validators on a list or set of strings apply to each element.
    let strings: Vec<(String, &str)> = match value {
        Value::String(s) => vec![(path.to_string(), s.as_str())],
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, item)| !is_unknown(item))
            .filter_map(|(i, item)| item.as_str().map(|s| (format!("{}.{}", path, i), s)))
            .collect(),
        _ => Vec::new(),
    };
    for (item_path, s) in strings {
        for validator in &attr.validators {
            if let Some(detail) = check_string(validator, s) {
                diagnostics.push(
                    Diagnostic::error(format!("Invalid value for '{}'", item_path))
                        .with_detail(detail)
                        .with_attribute(item_path.clone()),
                );
            }
        }
    }
}

fn validate_nested(
    nested: &NestedAttributes,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match nested.nesting {
        NestingMode::Single => {
            if value.is_object() {
                validate_attributes(&nested.attributes, value, path, diagnostics);
            } else {
                diagnostics.push(type_error(path, "object", value));
            }
        },
        NestingMode::List | NestingMode::Set => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}.{}", path, i);
                    if is_unknown(item) {
                        continue;
                    }
                    if item.is_object() {
                        validate_attributes(&nested.attributes, item, &item_path, diagnostics);
                    } else {
                        diagnostics.push(type_error(&item_path, "object", item));
                    }
                }
            },
            None => diagnostics.push(type_error(path, "list", value)),
        },
        NestingMode::Map => match value.as_object() {
            Some(map) => {
                for (key, item) in map {
                    let item_path = format!("{}.{}", path, key);
                    validate_attributes(&nested.attributes, item, &item_path, diagnostics);
                }
            },
            None => diagnostics.push(type_error(path, "map", value)),
        },
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if is_unknown(value) {
        return;
    }
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        },
        AttributeType::Map(value_type) => {
            if let Some(obj) = value.as_object() {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        },
        AttributeType::Object(attrs) => {
            if let Some(obj) = value.as_object() {
                for (name, attr_type) in attrs {
                    if let Some(v) = obj.get(name).filter(|v| !v.is_null()) {
                        validate_attribute_type(attr_type, v, &join_path(path, name), diagnostics);
                    }
                }
            } else {
                diagnostics.push(type_error(path, "object", value));
            }
        },
        AttributeType::Dynamic => {},
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64()
                || n.as_f64().is_some_and(|f| {
                    f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
                })
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        ))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeFlags;
    use crate::value::UNKNOWN_VALUE;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn schedule_schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "name",
                Attribute::required_string().with_validator(StringValidator::ValidName),
            )
            .with_attribute(
                "mode",
                Attribute::optional_string()
                    .with_validator(StringValidator::one_of(&["replicate", "snapshot"])),
            )
            .with_attribute(
                "schedule",
                Attribute::nested(
                    NestingMode::Single,
                    BTreeMap::from([
                        ("frequency".to_string(), Attribute::required_string()),
                        ("hour".to_string(), Attribute::optional_int64()),
                    ]),
                    AttributeFlags::required(),
                ),
            )
            .with_attribute(
                "schemas",
                Attribute::nested(
                    NestingMode::Set,
                    BTreeMap::from([
                        ("id".to_string(), Attribute::required_string()),
                        ("partition_key".to_string(), Attribute::optional_string()),
                    ]),
                    AttributeFlags::optional_computed(),
                ),
            )
            .with_attribute("labels", Attribute::string_set(AttributeFlags::optional()))
    }

    #[test]
    fn test_valid_config() {
        let diagnostics = validate(
            &schedule_schema(),
            &json!({
                "name": "Nightly",
                "mode": "replicate",
                "schedule": {"frequency": "daily", "hour": 3},
                "schemas": [{"id": "public.users"}],
                "labels": ["prod"]
            }),
        );
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[test]
    fn test_missing_required_attribute() {
        let diagnostics = validate(&schedule_schema(), &json!({"name": "Nightly"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("schedule"));
    }

    #[test]
    fn test_computed_attribute_cannot_be_set() {
        let diagnostics = validate(
            &schedule_schema(),
            &json!({"id": "abc", "name": "n", "schedule": {"frequency": "daily"}}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("id"));
    }

    #[test]
    fn test_string_validators() {
        let diagnostics = validate(
            &schedule_schema(),
            &json!({"name": "", "mode": "mirror", "schedule": {"frequency": "daily"}}),
        );
        let paths: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        assert_eq!(paths, vec!["mode", "name"]);
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("replicate, snapshot"));
    }

    #[test]
    fn test_nested_paths() {
        let diagnostics = validate(
            &schedule_schema(),
            &json!({
                "name": "n",
                "schedule": {"frequency": "daily", "hour": "three"},
                "schemas": [{"id": "a"}, {"partition_key": "k"}]
            }),
        );
        let paths: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        assert_eq!(paths, vec!["schedule.hour", "schemas.1.id"]);
    }

    #[test]
    fn test_unknown_values_pass() {
        let diagnostics = validate(
            &schedule_schema(),
            &json!({
                "name": UNKNOWN_VALUE,
                "schedule": UNKNOWN_VALUE,
                "labels": [UNKNOWN_VALUE]
            }),
        );
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[test]
    fn test_set_element_types() {
        let diagnostics = validate(
            &schedule_schema(),
            &json!({"name": "n", "schedule": {"frequency": "d"}, "labels": ["a", 1]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("labels.1"));
    }

    #[test]
    fn test_int64_accepts_integral_floats() {
        assert!(is_int64(&json!(42)));
        assert!(is_int64(&json!(42.0)));
        assert!(!is_int64(&json!(42.5)));
        assert!(!is_int64(&json!("42")));
    }

    #[test]
    fn test_email_validator() {
        assert!(check_string(&StringValidator::Email, "ops@example.com").is_none());
        assert!(check_string(&StringValidator::Email, "ops@localhost").is_some());
        assert!(check_string(&StringValidator::Email, "@example.com").is_some());
    }

    #[test]
    fn test_validators_apply_to_set_elements() {
        let schema = Schema::v0().with_attribute(
            "emails",
            Attribute::string_set(AttributeFlags::required()).with_validator(StringValidator::Email),
        );
        let diagnostics = validate(
            &schema,
            &json!({"emails": ["ops@example.com", "nope", UNKNOWN_VALUE]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("emails.1"));
    }

    #[test]
    fn test_root_not_object() {
        let diagnostics = validate(&schedule_schema(), &json!("nope"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
        assert!(validate_result(&schedule_schema(), &json!([])).is_err());
    }
}
