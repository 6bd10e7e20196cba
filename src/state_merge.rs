//! Reconciling API responses with planned values.
//!
//! After apply, the state a provider returns must agree with the plan: every
//! value the user configured comes back verbatim, and every value planned as
//! unknown is replaced by what the API reported. These helpers implement that
//! merge for scalars, objects, and keyed sets of objects.

use serde_json::{Map, Value};

use crate::value::{is_null_or_unknown, is_unknown};

/// Replace every unknown in `plan` with the value at the same path in `api`.
///
/// Known plan values are returned unchanged. Objects are walked per plan key;
/// arrays are walked element-wise when both sides have the same length,
/// otherwise unknown elements become null.
pub fn populate_unknown(plan: &Value, api: &Value) -> Value {
    match plan {
        v if is_unknown(v) => resolve_unknowns(api),
        Value::Object(plan_map) => {
            let api_map = api.as_object();
            Value::Object(
                plan_map
                    .iter()
                    .map(|(key, plan_value)| {
                        let api_value = api_map.and_then(|m| m.get(key)).unwrap_or(&Value::Null);
                        (key.clone(), populate_unknown(plan_value, api_value))
                    })
                    .collect(),
            )
        },
        Value::Array(plan_items) => match api.as_array() {
            Some(api_items) if api_items.len() == plan_items.len() => Value::Array(
                plan_items
                    .iter()
                    .zip(api_items)
                    .map(|(p, a)| populate_unknown(p, a))
                    .collect(),
            ),
            _ => Value::Array(
                plan_items
                    .iter()
                    .map(|p| populate_unknown(p, &Value::Null))
                    .collect(),
            ),
        },
        v => v.clone(),
    }
}

/// Like [`populate_unknown`], but fills unknowns from the prior state.
///
/// Used on refresh, where the "plan" side is the freshly read value and prior
/// state supplies what the API does not return.
pub fn populate_unknown_from_prior(current: &Value, prior: &Value) -> Value {
    populate_unknown(current, prior)
}

/// Merge a planned set of objects with the API's set, matching elements by key.
///
/// For each plan element, the API element with the same key supplies every
/// field the plan element left absent, null, or unknown; fields the plan specifies are
/// kept verbatim. Plan elements with no API match keep their own values with
/// unknowns resolved to null. The result follows the plan's order and never
/// contains API-only elements.
pub fn merge_set_elements<F>(plan: &[Value], api: &[Value], key: F) -> Vec<Value>
where
    F: Fn(&Value) -> Option<String>,
{
    plan.iter()
        .map(|plan_elem| {
            let matched = key(plan_elem).and_then(|k| {
                api.iter()
                    .find(|api_elem| key(api_elem).as_deref() == Some(k.as_str()))
            });
            match matched {
                Some(api_elem) => merge_object(plan_elem, api_elem),
                None => populate_unknown(plan_elem, &Value::Null),
            }
        })
        .collect()
}

/// Reconcile a set-valued attribute.
///
/// An unknown plan takes the API value verbatim (null included), a null plan
/// stays null, and a configured plan goes through [`merge_set_elements`].
pub fn reconcile_set<F>(plan: &Value, api: &Value, key: F) -> Value
where
    F: Fn(&Value) -> Option<String>,
{
    match plan {
        v if is_unknown(v) => resolve_unknowns(api),
        Value::Array(items) => {
            let api_items = api.as_array().map(Vec::as_slice).unwrap_or_default();
            Value::Array(merge_set_elements(items, api_items, key))
        },
        _ => Value::Null,
    }
}

/// Refresh a set-valued attribute from the API during read.
///
/// When the prior state holds a set, the result keeps only the API elements
/// whose key appears in it, in prior order; elements gone from the API are
/// dropped. Otherwise the API value is taken as is.
pub fn refresh_set<F>(prior: &Value, api: &Value, key: F) -> Value
where
    F: Fn(&Value) -> Option<String>,
{
    let (Some(prior_items), Some(api_items)) = (prior.as_array(), api.as_array()) else {
        return resolve_unknowns(api);
    };
    Value::Array(
        prior_items
            .iter()
            .filter_map(|p| {
                let k = key(p)?;
                api_items
                    .iter()
                    .find(|a| key(a).as_deref() == Some(k.as_str()))
                    .map(resolve_unknowns)
            })
            .collect(),
    )
}

/// Key extractor for set elements identified by a string field.
pub fn key_by(field: impl Into<String>) -> impl Fn(&Value) -> Option<String> {
    let field = field.into();
    move |v: &Value| {
        v.get(&field)
            .filter(|k| !is_null_or_unknown(k))
            .and_then(|k| match k {
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
    }
}

/// Restore values at `paths` in `state` from `prior` when the API masked them.
///
/// Write-only fields (passwords, tokens) come back from the API as null or as
/// a mask; the state keeps the last value the user configured.
pub fn preserve_sensitive(state: &mut Value, prior: &Value, paths: &[Vec<String>]) {
    for path in paths {
        let Some(prior_value) = lookup(prior, path).filter(|v| !is_null_or_unknown(v)) else {
            continue;
        };
        if let Some(slot) = lookup_mut(state, path) {
            if slot.is_null() || is_masked(slot) {
                *slot = prior_value.clone();
            }
        }
    }
}

fn merge_object(plan: &Value, api: &Value) -> Value {
    match (plan, api) {
        (Value::Object(plan_map), Value::Object(api_map)) => {
            let mut merged: Map<String, Value> = api_map
                .iter()
                .filter(|(key, _)| !plan_map.contains_key(*key))
                .map(|(key, value)| (key.clone(), resolve_unknowns(value)))
                .collect();
            for (key, plan_value) in plan_map {
                let api_value = api_map.get(key).unwrap_or(&Value::Null);
                let value = if is_null_or_unknown(plan_value) {
                    resolve_unknowns(api_value)
                } else {
                    merge_object(plan_value, api_value)
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        },
        (p, a) if is_null_or_unknown(p) => resolve_unknowns(a),
        (p, a) => populate_unknown(p, a),
    }
}

fn resolve_unknowns(value: &Value) -> Value {
    populate_unknown(value, &Value::Null)
}

fn is_masked(value: &Value) -> bool {
    matches!(value, Value::String(s) if !s.is_empty() && s.chars().all(|c| c == '*'))
}

fn lookup<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(key))
}

fn lookup_mut<'a>(value: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    path.iter().try_fold(value, |v, key| v.get_mut(key))
}
