//! `polytomic_bulk_sync_schema`: settings for one schema of a bulk sync.
//!
//! The schema itself belongs to the bulk sync; this resource only manages its
//! settings. Deleting it disables the schema.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::client::{BulkField, BulkSchema, Client};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, NestingMode, Schema};
use crate::state_merge::{key_by, populate_unknown, reconcile_set, refresh_set};
use crate::value::{from_state, require_str, set_attr};

use super::{split_import_id, Resource};

const IMPORT_FORMAT: &str = "bulk_sync_id/schema_id";

fn fields_attribute() -> Attribute {
    let mut attributes = BTreeMap::new();
    attributes.insert("id".to_string(), Attribute::required_string());
    attributes.insert("enabled".to_string(), Attribute::optional_computed_bool());
    attributes.insert(
        "obfuscated".to_string(),
        Attribute::optional_computed_bool(),
    );
    Attribute::nested(
        NestingMode::Set,
        attributes,
        AttributeFlags::optional_computed(),
    )
}

#[derive(Debug, Deserialize)]
struct FieldModel {
    id: String,
    enabled: Option<bool>,
    obfuscated: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct SchemaModel {
    bulk_sync_id: String,
    id: String,
    enabled: Option<bool>,
    partition_key: Option<String>,
    output_name: Option<String>,
    data_cutoff_timestamp: Option<String>,
    disable_data_cutoff: Option<bool>,
    fields: Option<Vec<FieldModel>>,
}

impl SchemaModel {
    fn into_request(self) -> (String, BulkSchema) {
        let schema = BulkSchema {
            id: self.id,
            enabled: Some(self.enabled.unwrap_or(true)),
            partition_key: self.partition_key,
            output_name: self.output_name,
            data_cutoff_timestamp: self.data_cutoff_timestamp,
            disable_data_cutoff: self.disable_data_cutoff,
            fields: self.fields.map(|fields| {
                fields
                    .into_iter()
                    .map(|f| BulkField {
                        id: f.id,
                        enabled: Some(f.enabled.unwrap_or(true)),
                        obfuscated: Some(f.obfuscated.unwrap_or(false)),
                    })
                    .collect()
            }),
        };
        (self.bulk_sync_id, schema)
    }
}

fn state_from_api(bulk_sync_id: &str, schema: &BulkSchema) -> Value {
    json!({
        "bulk_sync_id": bulk_sync_id,
        "id": schema.id,
        "enabled": schema.enabled.unwrap_or(false),
        "partition_key": schema.partition_key,
        "output_name": schema.output_name,
        "data_cutoff_timestamp": schema.data_cutoff_timestamp,
        "disable_data_cutoff": schema.disable_data_cutoff.unwrap_or(false),
        "fields": schema.fields.iter().flatten().map(|f| json!({
            "id": f.id,
            "enabled": f.enabled.unwrap_or(false),
            "obfuscated": f.obfuscated.unwrap_or(false),
        })).collect::<Vec<_>>(),
    })
}

/// Bulk sync schema resource.
pub struct BulkSyncSchemaResource;

impl BulkSyncSchemaResource {
    async fn apply(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError> {
        let model: SchemaModel = from_state(plan)?;
        let (bulk_sync_id, request) = model.into_request();
        let schema = client
            .update_bulk_sync_schema(&bulk_sync_id, &request)
            .await?;
        info!(bulk_sync_id = %bulk_sync_id, id = %schema.id, "Bulk sync schema updated");

        let api = state_from_api(&bulk_sync_id, &schema);
        let mut state = populate_unknown(plan, &api);
        let fields = reconcile_set(&plan["fields"], &api["fields"], key_by("id"));
        set_attr(&mut state, "fields", fields);
        Ok(state)
    }
}

#[async_trait::async_trait]
impl Resource for BulkSyncSchemaResource {
    fn type_name(&self) -> String {
        "polytomic_bulk_sync_schema".to_string()
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Settings of one schema in a bulk sync")
            .with_attribute(
                "bulk_sync_id",
                Attribute::required_string().with_force_new(),
            )
            .with_attribute(
                "id",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Schema ID within the bulk sync's source"),
            )
            .with_attribute("enabled", Attribute::optional_computed_bool())
            .with_attribute("partition_key", Attribute::optional_string())
            .with_attribute("output_name", Attribute::optional_computed_string())
            .with_attribute("data_cutoff_timestamp", Attribute::optional_string())
            .with_attribute(
                "disable_data_cutoff",
                Attribute::optional_computed_bool(),
            )
            .with_attribute("fields", fields_attribute())
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_bulk_sync_schema"))]
    async fn create(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError> {
        self.apply(client, plan).await
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_bulk_sync_schema"))]
    async fn read(&self, client: &Client, state: &Value) -> Result<Value, ProviderError> {
        let bulk_sync_id = require_str(state, "bulk_sync_id")?;
        let id = require_str(state, "id")?;
        let schema = client.get_bulk_sync_schema(bulk_sync_id, id).await?;
        let mut current = state_from_api(bulk_sync_id, &schema);
        let fields = refresh_set(&state["fields"], &current["fields"], key_by("id"));
        set_attr(&mut current, "fields", fields);
        Ok(current)
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_bulk_sync_schema"))]
    async fn update(
        &self,
        client: &Client,
        _prior: &Value,
        plan: &Value,
    ) -> Result<Value, ProviderError> {
        self.apply(client, plan).await
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_bulk_sync_schema"))]
    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        let bulk_sync_id = require_str(state, "bulk_sync_id")?;
        let id = require_str(state, "id")?;
        let disabled = BulkSchema {
            id: id.to_string(),
            enabled: Some(false),
            ..Default::default()
        };
        client
            .update_bulk_sync_schema(bulk_sync_id, &disabled)
            .await?;
        info!(bulk_sync_id, id, "Bulk sync schema disabled");
        Ok(())
    }

    async fn import(&self, client: &Client, id: &str) -> Result<Value, ProviderError> {
        let [bulk_sync_id, schema_id] = split_import_id::<2>(id, IMPORT_FORMAT)?;
        self.read(client, &json!({"bulk_sync_id": bulk_sync_id, "id": schema_id}))
            .await
    }
}
