//! `polytomic_bulk_sync`: replicates whole schemas between two connections.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use crate::client::{BulkSchema, BulkSync, BulkSyncRequest, Client, Schedule};
use crate::error::ProviderError;
use crate::schema::{
    Attribute, AttributeFlags, AttributeType, NestingMode, Schema, StringValidator,
};
use crate::state_merge::{key_by, populate_unknown, reconcile_set, refresh_set};
use crate::types::PlanResult;
use crate::value::{from_state, is_unknown, require_str, set_attr};

use super::{list_or_null, strings, Resource};

pub(crate) const FREQUENCIES: &[&str] = &[
    "manual",
    "continuous",
    "hourly",
    "daily",
    "weekly",
    "custom",
    "builtin",
    "runafter",
    "multi",
];

/// The `schedule` block shared by bulk syncs and model syncs.
pub(crate) fn schedule_attribute() -> Attribute {
    let mut attributes = BTreeMap::new();
    attributes.insert(
        "frequency".to_string(),
        Attribute::required_string().with_validator(StringValidator::one_of(FREQUENCIES)),
    );
    for name in ["day_of_week", "hour", "minute", "month", "day_of_month"] {
        attributes.insert(name.to_string(), Attribute::optional_string());
    }
    Attribute::nested(NestingMode::Single, attributes, AttributeFlags::required())
}

pub(crate) fn schedule_state(schedule: &Schedule) -> Value {
    json!({
        "frequency": schedule.frequency,
        "day_of_week": schedule.day_of_week,
        "hour": schedule.hour,
        "minute": schedule.minute,
        "month": schedule.month,
        "day_of_month": schedule.day_of_month,
    })
}

/// A map attribute as state: null when the API has nothing and nothing was configured.
pub(crate) fn map_or_null(prior: Option<&Value>, map: Option<&Map<String, Value>>) -> Value {
    match map {
        Some(m) if !m.is_empty() => Value::Object(m.clone()),
        _ if prior.is_some_and(Value::is_object) => json!({}),
        _ => Value::Null,
    }
}

fn schemas_attribute() -> Attribute {
    let mut attributes = BTreeMap::new();
    attributes.insert("id".to_string(), Attribute::required_string());
    attributes.insert("enabled".to_string(), Attribute::optional_computed_bool());
    attributes.insert("partition_key".to_string(), Attribute::optional_string());
    attributes.insert(
        "data_cutoff_timestamp".to_string(),
        Attribute::optional_string(),
    );
    Attribute::nested(
        NestingMode::Set,
        attributes,
        AttributeFlags::optional_computed(),
    )
    .with_description("Source schemas to replicate")
}

#[derive(Debug, Deserialize)]
struct SchemaModel {
    id: String,
    enabled: Option<bool>,
    partition_key: Option<String>,
    data_cutoff_timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BulkSyncModel {
    organization: Option<String>,
    name: String,
    active: Option<bool>,
    mode: Option<String>,
    source_connection_id: String,
    destination_connection_id: String,
    source_configuration: Option<Map<String, Value>>,
    destination_configuration: Option<Map<String, Value>>,
    schedule: Schedule,
    discover: Option<bool>,
    automatically_add_new_objects: Option<String>,
    automatically_add_new_fields: Option<String>,
    disable_record_timestamps: Option<bool>,
    policies: Option<Vec<String>>,
    schemas: Option<Vec<SchemaModel>>,
}

impl BulkSyncModel {
    fn request(self) -> BulkSyncRequest {
        BulkSyncRequest {
            name: self.name,
            organization_id: self.organization,
            active: self.active.unwrap_or(false),
            mode: self.mode,
            source_connection_id: self.source_connection_id,
            destination_connection_id: self.destination_connection_id,
            source_configuration: self.source_configuration,
            destination_configuration: self.destination_configuration,
            schedule: self.schedule,
            discover: self.discover.unwrap_or(false),
            automatically_add_new_objects: self.automatically_add_new_objects,
            automatically_add_new_fields: self.automatically_add_new_fields,
            disable_record_timestamps: self.disable_record_timestamps.unwrap_or(false),
            policies: self.policies.unwrap_or_default(),
            schemas: self.schemas.map(|schemas| {
                schemas
                    .into_iter()
                    .map(|s| BulkSchema {
                        id: s.id,
                        enabled: Some(s.enabled.unwrap_or(true)),
                        partition_key: s.partition_key,
                        data_cutoff_timestamp: s.data_cutoff_timestamp,
                        ..Default::default()
                    })
                    .collect()
            }),
        }
    }
}

fn schema_state(schema: &BulkSchema) -> Value {
    json!({
        "id": schema.id,
        "enabled": schema.enabled.unwrap_or(false),
        "partition_key": schema.partition_key,
        "data_cutoff_timestamp": schema.data_cutoff_timestamp,
    })
}

fn state_from_api(sync: &BulkSync, prior: Option<&Value>) -> Value {
    let field = |name: &str| prior.and_then(|p| p.get(name));
    json!({
        "id": sync.id,
        "organization": sync.organization_id,
        "name": sync.name,
        "active": sync.active,
        "mode": sync.mode,
        "source_connection_id": sync.source_connection_id,
        "destination_connection_id": sync.destination_connection_id,
        "source_configuration": map_or_null(field("source_configuration"), sync.source_configuration.as_ref()),
        "destination_configuration": map_or_null(field("destination_configuration"), sync.destination_configuration.as_ref()),
        "schedule": schedule_state(&sync.schedule),
        "discover": sync.discover,
        "automatically_add_new_objects": sync.automatically_add_new_objects,
        "automatically_add_new_fields": sync.automatically_add_new_fields,
        "disable_record_timestamps": sync.disable_record_timestamps,
        "policies": list_or_null(field("policies"), strings(&sync.policies)),
        "schemas": sync.schemas.iter().map(schema_state).collect::<Vec<_>>(),
    })
}

/// Bulk sync resource.
pub struct BulkSyncResource;

impl BulkSyncResource {
    fn applied_state(plan: &Value, sync: &BulkSync) -> Value {
        let api = state_from_api(sync, Some(plan));
        let mut state = populate_unknown(plan, &api);
        let schemas = reconcile_set(&plan["schemas"], &api["schemas"], key_by("id"));
        set_attr(&mut state, "schemas", schemas);
        state
    }
}

#[async_trait::async_trait]
impl Resource for BulkSyncResource {
    fn type_name(&self) -> String {
        "polytomic_bulk_sync".to_string()
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A bulk sync between two connections")
            .with_attribute("id", Attribute::id())
            .with_attribute("organization", Attribute::organization())
            .with_attribute(
                "name",
                Attribute::required_string().with_validator(StringValidator::ValidName),
            )
            .with_attribute("active", Attribute::optional_computed_bool())
            .with_attribute(
                "mode",
                Attribute::optional_computed_string()
                    .with_validator(StringValidator::one_of(&["replicate", "snapshot"])),
            )
            .with_attribute("source_connection_id", Attribute::required_string())
            .with_attribute(
                "destination_connection_id",
                Attribute::required_string().with_force_new(),
            )
            .with_attribute(
                "source_configuration",
                Attribute::new(
                    AttributeType::map(AttributeType::Dynamic),
                    AttributeFlags::optional(),
                ),
            )
            .with_attribute(
                "destination_configuration",
                Attribute::new(
                    AttributeType::map(AttributeType::Dynamic),
                    AttributeFlags::optional(),
                ),
            )
            .with_attribute("schedule", schedule_attribute())
            .with_attribute("discover", Attribute::optional_computed_bool())
            .with_attribute(
                "automatically_add_new_objects",
                Attribute::optional_computed_string(),
            )
            .with_attribute(
                "automatically_add_new_fields",
                Attribute::optional_computed_string(),
            )
            .with_attribute(
                "disable_record_timestamps",
                Attribute::optional_computed_bool(),
            )
            .with_attribute(
                "policies",
                Attribute::string_set(AttributeFlags::optional_computed()),
            )
            .with_attribute("schemas", schemas_attribute())
    }

    fn modify_plan(&self, plan: &mut PlanResult, _prior: Option<&Value>) {
        let Some(schemas) = plan
            .planned_state
            .get_mut("schemas")
            .and_then(Value::as_array_mut)
        else {
            return;
        };
        for schema in schemas {
            if schema.get("enabled").is_some_and(is_unknown) {
                set_attr(schema, "enabled", json!(true));
            }
        }
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_bulk_sync"))]
    async fn create(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError> {
        let model: BulkSyncModel = from_state(plan)?;
        let sync = client.create_bulk_sync(&model.request()).await?;
        info!(id = %sync.id, "Bulk sync created");
        Ok(Self::applied_state(plan, &sync))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_bulk_sync"))]
    async fn read(&self, client: &Client, state: &Value) -> Result<Value, ProviderError> {
        let id = require_str(state, "id")?;
        let sync = client.get_bulk_sync(id).await?;
        let mut current = state_from_api(&sync, Some(state));
        let schemas = refresh_set(&state["schemas"], &current["schemas"], key_by("id"));
        set_attr(&mut current, "schemas", schemas);
        Ok(current)
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_bulk_sync"))]
    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        plan: &Value,
    ) -> Result<Value, ProviderError> {
        let id = require_str(prior, "id")?;
        let model: BulkSyncModel = from_state(plan)?;
        let sync = client.update_bulk_sync(id, &model.request()).await?;
        info!(id = %sync.id, "Bulk sync updated");
        Ok(Self::applied_state(plan, &sync))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_bulk_sync"))]
    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        let id = require_str(state, "id")?;
        client.delete_bulk_sync(id).await?;
        info!(id, "Bulk sync deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan_resource;
    use crate::validation::validate;
    use crate::value::UNKNOWN_VALUE;

    fn config() -> Value {
        json!({
            "name": "Warehouse replication",
            "source_connection_id": "src",
            "destination_connection_id": "dst",
            "schedule": {"frequency": "daily", "hour": "2"},
            "schemas": [{"id": "public.users"}, {"id": "public.orders", "enabled": false}]
        })
    }

    #[test]
    fn test_schema_validates_frequency() {
        let schema = BulkSyncResource.schema();
        assert!(validate(&schema, &config()).is_empty());

        let mut bad = config();
        bad["schedule"]["frequency"] = json!("fortnightly");
        let diagnostics = validate(&schema, &bad);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("schedule.frequency")
        );
    }

    #[test]
    fn test_modify_plan_enables_new_schemas() {
        let resource = BulkSyncResource;
        let mut plan = plan_resource(&resource.schema(), None, &config());
        assert_eq!(plan.planned_state["schemas"][0]["enabled"], UNKNOWN_VALUE);
        resource.modify_plan(&mut plan, None);
        assert_eq!(plan.planned_state["schemas"][0]["enabled"], true);
        assert_eq!(plan.planned_state["schemas"][1]["enabled"], false);
    }

    #[test]
    fn test_request_leaves_schemas_untouched_when_unset() {
        let mut cfg = config();
        cfg["schemas"] = json!(UNKNOWN_VALUE);
        let model: BulkSyncModel = from_state(&cfg).unwrap();
        assert!(model.request().schemas.is_none());

        let model: BulkSyncModel = from_state(&config()).unwrap();
        let schemas = model.request().schemas.unwrap();
        assert_eq!(schemas[0].enabled, Some(true));
        assert_eq!(schemas[1].enabled, Some(false));
    }

    #[test]
    fn test_applied_state_keeps_plan_schemas_only() {
        let sync = BulkSync {
            id: "b1".into(),
            name: "Warehouse replication".into(),
            active: true,
            source_connection_id: "src".into(),
            destination_connection_id: "dst".into(),
            schedule: Schedule {
                frequency: "daily".into(),
                hour: Some("2".into()),
                ..Default::default()
            },
            schemas: vec![
                BulkSchema {
                    id: "public.orders".into(),
                    enabled: Some(false),
                    ..Default::default()
                },
                BulkSchema {
                    id: "public.users".into(),
                    enabled: Some(true),
                    partition_key: Some("created_at".into()),
                    ..Default::default()
                },
                BulkSchema {
                    id: "public.events".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let resource = BulkSyncResource;
        let mut plan = plan_resource(&resource.schema(), None, &config());
        resource.modify_plan(&mut plan, None);
        let state = BulkSyncResource::applied_state(&plan.planned_state, &sync);

        assert_eq!(state["id"], "b1");
        assert_eq!(state["active"], true);
        let schemas = state["schemas"].as_array().unwrap();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0]["id"], "public.users");
        assert_eq!(schemas[0]["partition_key"], "created_at");
        assert_eq!(schemas[1]["id"], "public.orders");
        assert!(!crate::value::contains_unknown(&state));
    }

    #[test]
    fn test_map_or_null() {
        assert_eq!(map_or_null(None, None), Value::Null);
        assert_eq!(map_or_null(Some(&json!({})), None), json!({}));
        let map = json!({"a": 1});
        assert_eq!(map_or_null(None, map.as_object()), map);
    }
}
