//! Schema-driven plan computation.
//!
//! [`plan_resource`] turns the proposed configuration and prior state into the
//! planned state the host will show the user and later hand back to
//! create/update. Resources refine the result in their own `modify_plan`.

use serde_json::{Map, Value};

use crate::schema::{Attribute, AttributeType, NestedAttributes, NestingMode, Schema};
use crate::state_merge::key_by;
use crate::types::{AttributeChange, PlanResult};
use crate::value::unknown;

/// Plan a resource.
///
/// - A null `proposed` value plans a destroy.
/// - Configured values are planned verbatim.
/// - Unconfigured computed attributes keep their prior value when nothing
///   else changes or when they use state for unknown; otherwise they are
///   planned as unknown. On create they are unknown unless they have a default.
/// - A change to a force-new attribute on an existing resource requires
///   replacement, and every unconfigured computed attribute becomes unknown.
pub fn plan_resource(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let prior = prior.filter(|p| !p.is_null());

    if proposed.is_null() {
        let changes = prior
            .map(|p| diff(schema, Some(p), &Value::Null))
            .unwrap_or_default();
        return PlanResult::with_changes(Value::Null, changes, false);
    }

    let mut planned = Map::new();
    let mut unconfigured_computed = Vec::new();

    for (name, attr) in &schema.attributes {
        let configured = proposed.get(name).filter(|v| !v.is_null());
        let prior_value = prior.and_then(|p| p.get(name)).filter(|v| !v.is_null());

        let value = match configured {
            Some(v) => match &attr.nested {
                Some(nested) => plan_nested(nested, v, prior_value),
                None => v.clone(),
            },
            None if attr.flags.computed => {
                unconfigured_computed.push((name.as_str(), attr));
                // An existing resource keeps its prior value, null included.
                match prior {
                    Some(p) => p.get(name).cloned().unwrap_or(Value::Null),
                    None => attr.default.clone().unwrap_or_else(unknown),
                }
            },
            None => attr.default.clone().unwrap_or(Value::Null),
        };
        planned.insert(name.clone(), value);
    }

    let Some(prior) = prior else {
        let planned = Value::Object(planned);
        let changes = diff(schema, None, &planned);
        return PlanResult::with_changes(planned, changes, false);
    };

    let planned_value = Value::Object(planned.clone());
    let initial_changes = diff(schema, Some(prior), &planned_value);
    let requires_replace = initial_changes.iter().any(|change| {
        schema
            .attributes
            .get(&change.path)
            .is_some_and(|attr| attr.force_new)
    });

    if requires_replace {
        for (name, attr) in &unconfigured_computed {
            planned.insert(
                name.to_string(),
                attr.default.clone().unwrap_or_else(unknown),
            );
        }
    } else if !initial_changes.is_empty() {
        for (name, attr) in &unconfigured_computed {
            if !attr.use_state_for_unknown {
                planned.insert(name.to_string(), unknown());
            }
        }
    } else {
        return PlanResult::no_change(planned_value);
    }

    let planned = Value::Object(planned);
    let changes = diff(schema, Some(prior), &planned);
    PlanResult::with_changes(planned, changes, requires_replace)
}

/// The attribute used to match elements of a nested set or list across plans.
pub fn nested_key(nested: &NestedAttributes) -> Option<&str> {
    if nested.attributes.contains_key("id") {
        return Some("id");
    }
    nested
        .attributes
        .iter()
        .find(|(_, attr)| attr.flags.required && attr.attr_type == AttributeType::String)
        .map(|(name, _)| name.as_str())
}

fn plan_nested(nested: &NestedAttributes, configured: &Value, prior: Option<&Value>) -> Value {
    match nested.nesting {
        NestingMode::Single => plan_object(nested, configured, prior),
        NestingMode::List | NestingMode::Set => {
            let Some(items) = configured.as_array() else {
                return configured.clone();
            };
            let prior_items = prior.and_then(Value::as_array);
            let key = nested_key(nested).map(key_by);
            Value::Array(
                items
                    .iter()
                    .map(|item| {
                        let matched = match (&key, prior_items) {
                            (Some(key), Some(prior_items)) => key(item).and_then(|k| {
                                prior_items
                                    .iter()
                                    .find(|p| key(*p).as_deref() == Some(k.as_str()))
                            }),
                            _ => None,
                        };
                        plan_object(nested, item, matched)
                    })
                    .collect(),
            )
        },
        NestingMode::Map => configured.clone(),
    }
}

/// Plan one nested object.
///
/// Configured children are kept as given, so clearing an optional child
/// plans null. Unset computed children take the prior object's value (null
/// included) when a prior object exists, and otherwise their default or
/// unknown.
fn plan_object(nested: &NestedAttributes, configured: &Value, prior: Option<&Value>) -> Value {
    let Value::Object(conf) = configured else {
        return configured.clone();
    };
    let prior_map = prior.and_then(Value::as_object);
    let mut out = conf.clone();
    for (name, attr) in &nested.attributes {
        let unset = out.get(name).map_or(true, Value::is_null);
        if !attr.flags.computed || !unset {
            continue;
        }
        let value = match prior_map {
            Some(p) => p.get(name).cloned().unwrap_or(Value::Null),
            None => attr.default.clone().unwrap_or_else(unknown),
        };
        out.insert(name.clone(), value);
    }
    Value::Object(out)
}

fn diff(schema: &Schema, prior: Option<&Value>, planned: &Value) -> Vec<AttributeChange> {
    let mut changes = Vec::new();
    for (name, attr) in &schema.attributes {
        let before = prior.and_then(|p| p.get(name)).filter(|v| !v.is_null());
        let after = planned.get(name).filter(|v| !v.is_null());
        match (before, after) {
            (None, None) => {},
            (None, Some(a)) => changes.push(AttributeChange::added(name.clone(), a.clone())),
            (Some(b), None) => changes.push(AttributeChange::removed(name.clone(), b.clone())),
            (Some(b), Some(a)) => {
                if !values_equal(attr, b, a) {
                    changes.push(AttributeChange::modified(name.clone(), b.clone(), a.clone()));
                }
            },
        }
    }
    changes
}

fn values_equal(attr: &Attribute, a: &Value, b: &Value) -> bool {
    match (&attr.attr_type, a, b) {
        (AttributeType::Set(_), Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len()
                && xs.iter().all(|x| ys.iter().any(|y| json_equal(x, y)))
                && ys.iter().all(|y| xs.iter().any(|x| json_equal(x, y)))
        },
        _ => json_equal(a, b),
    }
}

/// Structural equality where an absent object key equals null.
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(xs), Value::Object(ys)) => xs
            .keys()
            .chain(ys.keys())
            .all(|k| json_equal(xs.get(k).unwrap_or(&Value::Null), ys.get(k).unwrap_or(&Value::Null))),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        },
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeFlags;
    use crate::value::{is_unknown, UNKNOWN_VALUE};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn model_schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::id())
            .with_attribute("organization", Attribute::organization())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("connection_id", Attribute::required_string().with_force_new())
            .with_attribute("identifier", Attribute::optional_computed_string())
            .with_attribute("fields", Attribute::string_set(AttributeFlags::optional_computed()))
            .with_attribute(
                "labels",
                Attribute::string_set(AttributeFlags::optional()).with_default(json!([])),
            )
    }

    #[test]
    fn test_plan_create_marks_computed_unknown() {
        let plan = plan_resource(
            &model_schema(),
            None,
            &json!({"name": "Accounts", "connection_id": "c1"}),
        );

        let state = &plan.planned_state;
        assert!(is_unknown(&state["id"]));
        assert!(is_unknown(&state["organization"]));
        assert!(is_unknown(&state["identifier"]));
        assert!(is_unknown(&state["fields"]));
        assert_eq!(state["labels"], json!([]));
        assert_eq!(state["name"], "Accounts");
        assert!(!plan.requires_replace);
        assert!(plan.changes.iter().any(|c| c.path == "name"));
    }

    #[test]
    fn test_plan_no_change_keeps_prior() {
        let prior = json!({
            "id": "m1", "organization": "o1", "name": "Accounts", "connection_id": "c1",
            "identifier": "Id", "fields": ["Id", "Name"], "labels": []
        });
        let plan = plan_resource(
            &model_schema(),
            Some(&prior),
            &json!({"name": "Accounts", "connection_id": "c1"}),
        );
        assert!(!plan.has_changes());
        assert_eq!(plan.planned_state, prior);
    }

    #[test]
    fn test_plan_set_order_is_not_a_change() {
        let prior = json!({
            "id": "m1", "organization": "o1", "name": "Accounts", "connection_id": "c1",
            "identifier": "Id", "fields": ["Id", "Name"], "labels": ["b", "a"]
        });
        let plan = plan_resource(
            &model_schema(),
            Some(&prior),
            &json!({"name": "Accounts", "connection_id": "c1", "labels": ["a", "b"]}),
        );
        assert!(!plan.has_changes(), "{:?}", plan.changes);
    }

    #[test]
    fn test_plan_update_uses_state_for_unknown_only_where_marked() {
        let prior = json!({
            "id": "m1", "organization": "o1", "name": "Accounts", "connection_id": "c1",
            "identifier": "Id", "fields": ["Id", "Name"], "labels": []
        });
        let plan = plan_resource(
            &model_schema(),
            Some(&prior),
            &json!({"name": "All accounts", "connection_id": "c1"}),
        );

        let state = &plan.planned_state;
        assert_eq!(state["id"], "m1");
        assert_eq!(state["organization"], "o1");
        assert!(is_unknown(&state["identifier"]));
        assert!(is_unknown(&state["fields"]));
        assert!(!plan.requires_replace);
        assert_eq!(plan.changes[0].path, "fields");
    }

    #[test]
    fn test_plan_force_new_requires_replace() {
        let prior = json!({
            "id": "m1", "organization": "o1", "name": "Accounts", "connection_id": "c1",
            "identifier": "Id", "fields": ["Id"], "labels": []
        });
        let plan = plan_resource(
            &model_schema(),
            Some(&prior),
            &json!({"name": "Accounts", "connection_id": "c2"}),
        );
        assert!(plan.requires_replace);
        assert!(is_unknown(&plan.planned_state["id"]));
        assert!(is_unknown(&plan.planned_state["organization"]));
    }

    #[test]
    fn test_plan_destroy() {
        let prior = json!({"id": "m1", "name": "Accounts", "connection_id": "c1"});
        let plan = plan_resource(&model_schema(), Some(&prior), &Value::Null);
        assert!(plan.planned_state.is_null());
        assert_eq!(plan.changes.len(), 3);
        assert!(plan.changes.iter().all(|c| c.after.is_none()));
    }

    #[test]
    fn test_plan_nested_set_fills_computed_from_prior() {
        let schema = Schema::v0().with_attribute(
            "schemas",
            Attribute::nested(
                NestingMode::Set,
                BTreeMap::from([
                    ("id".to_string(), Attribute::required_string()),
                    ("enabled".to_string(), Attribute::optional_computed_bool()),
                ]),
                AttributeFlags::optional_computed(),
            ),
        );
        let prior = json!({"schemas": [{"id": "users", "enabled": true}]});
        let plan = plan_resource(
            &schema,
            Some(&prior),
            &json!({"schemas": [{"id": "users"}, {"id": "orders"}]}),
        );

        let schemas = plan.planned_state["schemas"].as_array().unwrap();
        assert_eq!(schemas[0], json!({"id": "users", "enabled": true}));
        assert_eq!(schemas[1]["enabled"], json!(UNKNOWN_VALUE));
        assert!(plan.has_changes());
    }

    #[test]
    fn test_plan_null_prior_computed_is_stable() {
        let schema = Schema::v0()
            .with_attribute("id", Attribute::id())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("filter_logic", Attribute::optional_computed_string());
        let prior = json!({"id": "s1", "name": "n", "filter_logic": null});

        let plan = plan_resource(&schema, Some(&prior), &json!({"name": "n"}));
        assert!(!plan.has_changes(), "{:?}", plan.changes);
        assert!(plan.planned_state["filter_logic"].is_null());

        // Another change still leaves the computed value to the apply.
        let plan = plan_resource(&schema, Some(&prior), &json!({"name": "m"}));
        assert!(is_unknown(&plan.planned_state["filter_logic"]));
        assert_eq!(plan.planned_state["id"], "s1");
    }

    #[test]
    fn test_plan_nested_set_optional_child_can_be_cleared() {
        let schema = Schema::v0().with_attribute(
            "schemas",
            Attribute::nested(
                NestingMode::Set,
                BTreeMap::from([
                    ("id".to_string(), Attribute::required_string()),
                    ("enabled".to_string(), Attribute::optional_computed_bool()),
                    ("partition_key".to_string(), Attribute::optional_string()),
                    ("data_cutoff_timestamp".to_string(), Attribute::optional_computed_string()),
                ]),
                AttributeFlags::optional_computed(),
            ),
        );
        let prior = json!({"schemas": [{
            "id": "public.users",
            "enabled": true,
            "partition_key": "created_at",
            "data_cutoff_timestamp": null
        }]});

        let plan = plan_resource(
            &schema,
            Some(&prior),
            &json!({"schemas": [{"id": "public.users", "partition_key": null}]}),
        );

        let users = &plan.planned_state["schemas"][0];
        assert!(users["partition_key"].is_null());
        assert_eq!(users["enabled"], true);
        assert!(users["data_cutoff_timestamp"].is_null());
        assert!(plan.changes.iter().any(|c| c.path == "schemas"));
    }

    #[test]
    fn test_nested_key_prefers_id() {
        let nested = NestedAttributes {
            nesting: NestingMode::Set,
            attributes: BTreeMap::from([
                ("action".to_string(), Attribute::required_string()),
                ("id".to_string(), Attribute::optional_string()),
            ]),
        };
        assert_eq!(nested_key(&nested), Some("id"));

        let nested = NestedAttributes {
            nesting: NestingMode::Set,
            attributes: BTreeMap::from([("action".to_string(), Attribute::required_string())]),
        };
        assert_eq!(nested_key(&nested), Some("action"));
    }

    #[test]
    fn test_plan_single_nested_keeps_prior_computed_and_configured_unknown() {
        let schema = Schema::v0().with_attribute(
            "configuration",
            Attribute::nested(
                NestingMode::Single,
                BTreeMap::from([
                    ("hostname".to_string(), Attribute::required_string()),
                    ("port".to_string(), Attribute::optional_int64()),
                    ("ssl".to_string(), Attribute::optional_computed_bool()),
                    ("password".to_string(), Attribute::optional_string().sensitive()),
                ]),
                AttributeFlags::required(),
            ),
        );
        let prior = json!({"configuration": {
            "hostname": "db", "port": 5432, "ssl": true, "password": null
        }});

        let plan = plan_resource(
            &schema,
            Some(&prior),
            &json!({"configuration": {"hostname": "db", "port": 5432}}),
        );
        assert!(!plan.has_changes(), "{:?}", plan.changes);
        assert_eq!(plan.planned_state["configuration"]["ssl"], true);

        let plan = plan_resource(
            &schema,
            Some(&prior),
            &json!({"configuration": {"hostname": UNKNOWN_VALUE}}),
        );
        assert!(is_unknown(&plan.planned_state["configuration"]["hostname"]));
        assert!(plan.planned_state["configuration"]["port"].is_null());
        assert!(plan.has_changes());
    }
}
