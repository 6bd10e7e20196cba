//! `polytomic_sync`: moves model records into a target object.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use crate::client::{
    Client, ModelSync, Schedule, SyncField, SyncFilter, SyncIdentity, SyncRequest, SyncSource,
    SyncTarget,
};
use crate::error::ProviderError;
use crate::schema::{
    Attribute, AttributeFlags, AttributeType, NestingMode, Schema, StringValidator,
};
use crate::state_merge::{key_by, populate_unknown, reconcile_set, refresh_set};
use crate::value::{from_state, require_str, set_attr};

use super::bulk_sync::{map_or_null, schedule_attribute, schedule_state};
use super::model::project_keys;
use super::{list_or_null, strings, Resource};

const MODES: &[&str] = &["create", "update", "updateOrCreate", "replace", "append"];

fn nested(
    mode: NestingMode,
    flags: AttributeFlags,
    attrs: impl IntoIterator<Item = (&'static str, Attribute)>,
) -> Attribute {
    let attributes: BTreeMap<String, Attribute> = attrs
        .into_iter()
        .map(|(name, attr)| (name.to_string(), attr))
        .collect();
    Attribute::nested(mode, attributes, flags)
}

fn source_attribute(flags: AttributeFlags) -> Attribute {
    nested(
        NestingMode::Single,
        flags,
        [
            ("model_id", Attribute::required_string()),
            ("field", Attribute::required_string()),
        ],
    )
}

fn dynamic_map(flags: AttributeFlags) -> Attribute {
    Attribute::new(AttributeType::map(AttributeType::Dynamic), flags)
}

fn fields_attribute(description: &str) -> Attribute {
    nested(
        NestingMode::Set,
        AttributeFlags::optional(),
        [
            ("target", Attribute::required_string()),
            ("source", source_attribute(AttributeFlags::optional())),
            ("override_value", Attribute::optional_string()),
            ("new", Attribute::optional_computed_bool()),
            ("sync_mode", Attribute::optional_computed_string()),
        ],
    )
    .with_description(description)
}

#[derive(Debug, Deserialize)]
struct TargetModel {
    connection_id: String,
    object: Option<String>,
    new_name: Option<String>,
    configuration: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct SourceModel {
    model_id: String,
    field: String,
}

impl From<SourceModel> for SyncSource {
    fn from(s: SourceModel) -> Self {
        SyncSource {
            model_id: s.model_id,
            field: s.field,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FieldModel {
    target: String,
    source: Option<SourceModel>,
    override_value: Option<String>,
    new: Option<bool>,
    sync_mode: Option<String>,
}

impl From<FieldModel> for SyncField {
    fn from(f: FieldModel) -> Self {
        SyncField {
            target: f.target,
            source: f.source.map(Into::into),
            override_value: f.override_value,
            new: f.new.unwrap_or(false),
            sync_mode: f.sync_mode,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FilterModel {
    field_id: String,
    field_type: Option<String>,
    function: String,
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct IdentityModel {
    source: SourceModel,
    target: String,
    function: String,
    new_field: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct SyncModel {
    organization: Option<String>,
    name: String,
    mode: String,
    active: Option<bool>,
    sync_all_records: Option<bool>,
    target: TargetModel,
    schedule: Schedule,
    fields: Option<Vec<FieldModel>>,
    override_fields: Option<Vec<FieldModel>>,
    filters: Option<Vec<FilterModel>>,
    filter_logic: Option<String>,
    identity: Option<IdentityModel>,
    policies: Option<Vec<String>>,
}

fn sync_fields(fields: Option<Vec<FieldModel>>) -> Vec<SyncField> {
    fields
        .unwrap_or_default()
        .into_iter()
        .map(Into::into)
        .collect()
}

impl SyncModel {
    fn request(self) -> SyncRequest {
        SyncRequest {
            name: self.name,
            organization_id: self.organization,
            target: SyncTarget {
                connection_id: self.target.connection_id,
                object: self.target.object,
                new_name: self.target.new_name,
                configuration: self.target.configuration,
            },
            mode: self.mode,
            schedule: self.schedule,
            fields: sync_fields(self.fields),
            override_fields: sync_fields(self.override_fields),
            filters: self
                .filters
                .unwrap_or_default()
                .into_iter()
                .map(|f| SyncFilter {
                    field_id: f.field_id,
                    field_type: f.field_type,
                    function: f.function,
                    value: f.value,
                })
                .collect(),
            filter_logic: self.filter_logic,
            identity: self.identity.map(|i| SyncIdentity {
                source: i.source.into(),
                target: i.target,
                function: i.function,
                new_field: i.new_field.unwrap_or(false),
            }),
            active: self.active.unwrap_or(false),
            sync_all_records: self.sync_all_records.unwrap_or(false),
            policies: self.policies.unwrap_or_default(),
        }
    }
}

fn source_state(source: &SyncSource) -> Value {
    json!({"model_id": source.model_id, "field": source.field})
}

fn field_state(field: &SyncField) -> Value {
    json!({
        "target": field.target,
        "source": field.source.as_ref().map(source_state),
        "override_value": field.override_value,
        "new": field.new,
        "sync_mode": field.sync_mode,
    })
}

fn state_from_api(sync: &ModelSync, prior: Option<&Value>) -> Value {
    let field = |name: &str| prior.and_then(|p| p.get(name));
    let prior_target_config = field("target").and_then(|t| t.get("configuration"));

    json!({
        "id": sync.id,
        "organization": sync.organization_id,
        "name": sync.name,
        "mode": sync.mode,
        "active": sync.active,
        "sync_all_records": sync.sync_all_records,
        "target": {
            "connection_id": sync.target.connection_id,
            "object": sync.target.object,
            "new_name": sync.target.new_name,
            "configuration": match &sync.target.configuration {
                Some(config) if prior_target_config.is_some_and(Value::is_object) => {
                    project_keys(prior_target_config, config)
                },
                config => map_or_null(prior_target_config, config.as_ref()),
            },
        },
        "schedule": schedule_state(&sync.schedule),
        "fields": list_or_null(field("fields"), sync.fields.iter().map(field_state).collect()),
        "override_fields": list_or_null(
            field("override_fields"),
            sync.override_fields.iter().map(field_state).collect(),
        ),
        "filters": list_or_null(field("filters"), sync.filters.iter().map(|f| json!({
            "field_id": f.field_id,
            "field_type": f.field_type,
            "function": f.function,
            "value": f.value,
        })).collect()),
        "filter_logic": sync.filter_logic,
        "identity": sync.identity.as_ref().map(|i| json!({
            "source": source_state(&i.source),
            "target": i.target,
            "function": i.function,
            "new_field": i.new_field,
        })),
        "policies": list_or_null(field("policies"), strings(&sync.policies)),
    })
}

/// Model sync resource.
pub struct SyncResource;

impl SyncResource {
    fn applied_state(plan: &Value, sync: &ModelSync) -> Value {
        let api = state_from_api(sync, Some(plan));
        let mut state = populate_unknown(plan, &api);
        for name in ["fields", "override_fields"] {
            let merged = reconcile_set(&plan[name], &api[name], key_by("target"));
            set_attr(&mut state, name, merged);
        }
        state
    }
}

#[async_trait::async_trait]
impl Resource for SyncResource {
    fn type_name(&self) -> String {
        "polytomic_sync".to_string()
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A sync from a model to a target object")
            .with_attribute("id", Attribute::id())
            .with_attribute("organization", Attribute::organization())
            .with_attribute(
                "name",
                Attribute::required_string().with_validator(StringValidator::ValidName),
            )
            .with_attribute(
                "mode",
                Attribute::required_string().with_validator(StringValidator::one_of(MODES)),
            )
            .with_attribute("active", Attribute::optional_computed_bool())
            .with_attribute("sync_all_records", Attribute::optional_computed_bool())
            .with_attribute(
                "target",
                nested(
                    NestingMode::Single,
                    AttributeFlags::required(),
                    [
                        ("connection_id", Attribute::required_string()),
                        ("object", Attribute::optional_computed_string()),
                        ("new_name", Attribute::optional_string()),
                        ("configuration", dynamic_map(AttributeFlags::optional())),
                    ],
                ),
            )
            .with_attribute("schedule", schedule_attribute())
            .with_attribute("fields", fields_attribute("Field mappings, matched by target"))
            .with_attribute(
                "override_fields",
                fields_attribute("Fields written with a fixed value"),
            )
            .with_attribute(
                "filters",
                nested(
                    NestingMode::List,
                    AttributeFlags::optional(),
                    [
                        ("field_id", Attribute::required_string()),
                        ("field_type", Attribute::optional_string()),
                        ("function", Attribute::required_string()),
                        (
                            "value",
                            Attribute::new(AttributeType::Dynamic, AttributeFlags::optional()),
                        ),
                    ],
                ),
            )
            .with_attribute("filter_logic", Attribute::optional_string())
            .with_attribute(
                "identity",
                nested(
                    NestingMode::Single,
                    AttributeFlags::optional(),
                    [
                        ("source", source_attribute(AttributeFlags::required())),
                        ("target", Attribute::required_string()),
                        ("function", Attribute::required_string()),
                        ("new_field", Attribute::optional_computed_bool()),
                    ],
                ),
            )
            .with_attribute(
                "policies",
                Attribute::string_set(AttributeFlags::optional_computed()),
            )
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_sync"))]
    async fn create(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError> {
        let model: SyncModel = from_state(plan)?;
        let sync = client.create_sync(&model.request()).await?;
        info!(id = %sync.id, "Sync created");
        Ok(Self::applied_state(plan, &sync))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_sync"))]
    async fn read(&self, client: &Client, state: &Value) -> Result<Value, ProviderError> {
        let id = require_str(state, "id")?;
        let sync = client.get_sync(id).await?;
        let mut current = state_from_api(&sync, Some(state));
        for name in ["fields", "override_fields"] {
            if state[name].is_array() {
                let refreshed = refresh_set(&state[name], &current[name], key_by("target"));
                set_attr(&mut current, name, refreshed);
            }
        }
        Ok(current)
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_sync"))]
    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        plan: &Value,
    ) -> Result<Value, ProviderError> {
        let id = require_str(prior, "id")?;
        let model: SyncModel = from_state(plan)?;
        let sync = client.update_sync(id, &model.request()).await?;
        info!(id = %sync.id, "Sync updated");
        Ok(Self::applied_state(plan, &sync))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_sync"))]
    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        let id = require_str(state, "id")?;
        client.delete_sync(id).await?;
        info!(id, "Sync deleted");
        Ok(())
    }
}
