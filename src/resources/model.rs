//! `polytomic_model`: a field-mapped view over a connection's data.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use crate::client::{Client, Model, ModelField, ModelRequest};
use crate::error::ProviderError;
use crate::schema::{
    Attribute, AttributeFlags, AttributeType, NestingMode, Schema, StringValidator,
};
use crate::state_merge::{key_by, populate_unknown, reconcile_set, refresh_set};
use crate::value::{from_state, require_str, set_attr};

use super::{list_or_null, strings, Resource};

fn additional_fields_attribute() -> Attribute {
    let mut attributes = BTreeMap::new();
    attributes.insert("name".to_string(), Attribute::required_string());
    attributes.insert("type".to_string(), Attribute::required_string());
    attributes.insert("label".to_string(), Attribute::optional_computed_string());
    Attribute::nested(NestingMode::Set, attributes, AttributeFlags::optional())
        .with_description("Fields the source does not report, added by name")
}

/// Keep only the keys of `api` that `prior` also holds.
///
/// Connectors echo back defaults the user never configured; reporting them
/// would show a permanent diff.
pub(crate) fn project_keys(prior: Option<&Value>, api: &Map<String, Value>) -> Value {
    match prior.and_then(Value::as_object) {
        Some(prior) => Value::Object(
            api.iter()
                .filter(|(k, _)| prior.contains_key(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        None => Value::Object(api.clone()),
    }
}

#[derive(Debug, Deserialize)]
struct AdditionalField {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelModel {
    organization: Option<String>,
    name: String,
    connection_id: String,
    configuration: Map<String, Value>,
    fields: Option<Vec<String>>,
    additional_fields: Option<Vec<AdditionalField>>,
    identifier: Option<String>,
    tracking_columns: Option<Vec<String>>,
    labels: Option<Vec<String>>,
    policies: Option<Vec<String>>,
}

impl ModelModel {
    fn request(self) -> ModelRequest {
        ModelRequest {
            name: self.name,
            organization_id: self.organization,
            connection_id: self.connection_id,
            configuration: self.configuration,
            fields: self.fields.unwrap_or_default(),
            additional_fields: self
                .additional_fields
                .unwrap_or_default()
                .into_iter()
                .map(|f| ModelField {
                    name: f.name,
                    field_type: Some(f.field_type),
                    label: f.label,
                    user_added: true,
                    ..Default::default()
                })
                .collect(),
            identifier: self.identifier,
            tracking_columns: self.tracking_columns.unwrap_or_default(),
            labels: self.labels.unwrap_or_default(),
            policies: self.policies.unwrap_or_default(),
        }
    }
}

fn state_from_api(model: &Model, prior: Option<&Value>) -> Value {
    let field = |name: &str| prior.and_then(|p| p.get(name));
    let (added, discovered): (Vec<&ModelField>, Vec<&ModelField>) =
        model.fields.iter().partition(|f| f.user_added);

    json!({
        "id": model.id,
        "organization": model.organization_id,
        "name": model.name,
        "connection_id": model.connection_id,
        "type": model.model_type,
        "version": model.version,
        "configuration": project_keys(field("configuration"), &model.configuration),
        "fields": discovered.iter().map(|f| json!(f.name)).collect::<Vec<_>>(),
        "additional_fields": list_or_null(
            field("additional_fields"),
            added.iter().map(|f| json!({
                "name": f.name,
                "type": f.field_type,
                "label": f.label,
            })).collect(),
        ),
        "identifier": model.identifier,
        "tracking_columns": list_or_null(field("tracking_columns"), strings(&model.tracking_columns)),
        "labels": list_or_null(field("labels"), strings(&model.labels)),
        "policies": list_or_null(field("policies"), strings(&model.policies)),
    })
}

/// Model resource.
pub struct ModelResource;

impl ModelResource {
    fn applied_state(plan: &Value, model: &Model) -> Value {
        let api = state_from_api(model, Some(plan));
        let mut state = populate_unknown(plan, &api);
        let added = reconcile_set(
            &plan["additional_fields"],
            &api["additional_fields"],
            key_by("name"),
        );
        set_attr(&mut state, "additional_fields", added);
        state
    }
}

#[async_trait::async_trait]
impl Resource for ModelResource {
    fn type_name(&self) -> String {
        "polytomic_model".to_string()
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A model over a connection")
            .with_attribute("id", Attribute::id())
            .with_attribute("organization", Attribute::organization())
            .with_attribute(
                "name",
                Attribute::required_string().with_validator(StringValidator::ValidName),
            )
            .with_attribute(
                "connection_id",
                Attribute::required_string().with_force_new(),
            )
            .with_attribute(
                "configuration",
                Attribute::new(
                    AttributeType::map(AttributeType::Dynamic),
                    AttributeFlags::required(),
                )
                .with_description("Connection-specific model definition, e.g. a query or table"),
            )
            .with_attribute(
                "fields",
                Attribute::string_set(AttributeFlags::optional_computed())
                    .with_description("Source fields to include; all when unset"),
            )
            .with_attribute("additional_fields", additional_fields_attribute())
            .with_attribute("identifier", Attribute::optional_computed_string())
            .with_attribute(
                "tracking_columns",
                Attribute::string_set(AttributeFlags::optional()),
            )
            .with_attribute("labels", Attribute::string_set(AttributeFlags::optional()))
            .with_attribute(
                "policies",
                Attribute::string_set(AttributeFlags::optional_computed()),
            )
            .with_attribute("type", Attribute::computed_string())
            .with_attribute(
                "version",
                Attribute::new(AttributeType::Int64, AttributeFlags::computed()),
            )
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_model"))]
    async fn create(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError> {
        let model: ModelModel = from_state(plan)?;
        let created = client.create_model(&model.request()).await?;
        info!(id = %created.id, "Model created");
        Ok(Self::applied_state(plan, &created))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_model"))]
    async fn read(&self, client: &Client, state: &Value) -> Result<Value, ProviderError> {
        let id = require_str(state, "id")?;
        let model = client.get_model(id).await?;
        let mut current = state_from_api(&model, Some(state));
        let added = refresh_set(
            &state["additional_fields"],
            &current["additional_fields"],
            key_by("name"),
        );
        set_attr(&mut current, "additional_fields", added);
        Ok(current)
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_model"))]
    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        plan: &Value,
    ) -> Result<Value, ProviderError> {
        let id = require_str(prior, "id")?;
        let model: ModelModel = from_state(plan)?;
        let updated = client.update_model(id, &model.request()).await?;
        info!(id = %updated.id, "Model updated");
        Ok(Self::applied_state(plan, &updated))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_model"))]
    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        let id = require_str(state, "id")?;
        client.delete_model(id).await?;
        info!(id, "Model deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan_resource;
    use crate::value::contains_unknown;

    fn api_model() -> Model {
        Model {
            id: "m1".into(),
            name: "Users".into(),
            connection_id: "c1".into(),
            model_type: Some("query".into()),
            configuration: json!({"query": "select * from users", "timeout": 30})
                .as_object()
                .cloned()
                .unwrap_or_default(),
            fields: vec![
                ModelField {
                    name: "id".into(),
                    ..Default::default()
                },
                ModelField {
                    name: "email".into(),
                    ..Default::default()
                },
                ModelField {
                    name: "segment".into(),
                    field_type: Some("string".into()),
                    label: Some("Segment".into()),
                    user_added: true,
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_project_keys() {
        let api = json!({"query": "q", "timeout": 30});
        let api = api.as_object().unwrap();
        assert_eq!(project_keys(Some(&json!({"query": "x"})), api), json!({"query": "q"}));
        assert_eq!(project_keys(None, api), json!({"query": "q", "timeout": 30}));
    }

    #[test]
    fn test_applied_state_splits_fields() {
        let config = json!({
            "name": "Users",
            "connection_id": "c1",
            "configuration": {"query": "select * from users"},
            "additional_fields": [{"name": "segment", "type": "string"}]
        });
        let plan = plan_resource(&ModelResource.schema(), None, &config).planned_state;
        let state = ModelResource::applied_state(&plan, &api_model());

        assert_eq!(state["id"], "m1");
        assert_eq!(state["type"], "query");
        assert_eq!(state["fields"], json!(["id", "email"]));
        assert_eq!(state["configuration"], json!({"query": "select * from users"}));
        assert_eq!(state["additional_fields"][0]["label"], "Segment");
        assert_eq!(state["labels"], Value::Null);
        assert!(!contains_unknown(&state));
    }

    #[test]
    fn test_request_marks_additional_fields() {
        let model: ModelModel = from_state(&json!({
            "name": "Users",
            "connection_id": "c1",
            "configuration": {"table": "users"},
            "additional_fields": [{"name": "segment", "type": "string"}]
        }))
        .unwrap();
        let request = model.request();
        assert!(request.fields.is_empty());
        assert!(request.additional_fields[0].user_added);
        assert_eq!(request.additional_fields[0].field_type.as_deref(), Some("string"));
    }
}
