//! `polytomic_primary_keys`: overrides the detected primary keys of a
//! connection schema. Deleting the resource restores detection.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::client::{Client, ConnectionSchema};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, Schema};
use crate::value::{from_state, require_str};

use super::{resolve_organization, split_import_id, strings, Resource};

const IMPORT_FORMAT: &str = "organization/connection_id/schema_id";

#[derive(Debug, Deserialize)]
struct PrimaryKeysModel {
    organization: Option<String>,
    connection_id: String,
    schema_id: String,
    fields: Vec<String>,
}

fn state(org: &str, connection_id: &str, schema: &ConnectionSchema) -> Value {
    json!({
        "id": format!("{}/{}/{}", org, connection_id, schema.id),
        "organization": org,
        "connection_id": connection_id,
        "schema_id": schema.id,
        "fields": strings(&schema.primary_keys()),
    })
}

/// Primary keys resource.
pub struct PrimaryKeysResource;

impl PrimaryKeysResource {
    async fn apply(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError> {
        let model: PrimaryKeysModel = from_state(plan)?;
        let org = resolve_organization(client, model.organization.as_deref()).await?;
        let schema = client
            .set_primary_keys(&model.connection_id, &model.schema_id, &model.fields)
            .await?;
        info!(
            connection_id = %model.connection_id,
            schema_id = %model.schema_id,
            "Primary keys set"
        );
        let mut current = state(&org, &model.connection_id, &schema);
        // Keep the configured order; the API reports fields in schema order.
        current["fields"] = plan["fields"].clone();
        Ok(current)
    }
}

#[async_trait::async_trait]
impl Resource for PrimaryKeysResource {
    fn type_name(&self) -> String {
        "polytomic_primary_keys".to_string()
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Primary key override for a connection schema")
            .with_attribute("id", Attribute::id())
            .with_attribute("organization", Attribute::organization())
            .with_attribute(
                "connection_id",
                Attribute::required_string().with_force_new(),
            )
            .with_attribute("schema_id", Attribute::required_string().with_force_new())
            .with_attribute(
                "fields",
                Attribute::string_set(AttributeFlags::required())
                    .with_description("Field IDs that form the primary key"),
            )
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_primary_keys"))]
    async fn create(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError> {
        self.apply(client, plan).await
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_primary_keys"))]
    async fn read(&self, client: &Client, current: &Value) -> Result<Value, ProviderError> {
        let connection_id = require_str(current, "connection_id")?;
        let schema_id = require_str(current, "schema_id")?;
        let org = resolve_organization(client, crate::value::get_str(current, "organization"))
            .await?;
        let schema = client
            .get_connection_schema(connection_id, schema_id)
            .await?;
        Ok(state(&org, connection_id, &schema))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_primary_keys"))]
    async fn update(
        &self,
        client: &Client,
        _prior: &Value,
        plan: &Value,
    ) -> Result<Value, ProviderError> {
        self.apply(client, plan).await
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_primary_keys"))]
    async fn delete(&self, client: &Client, current: &Value) -> Result<(), ProviderError> {
        let connection_id = require_str(current, "connection_id")?;
        let schema_id = require_str(current, "schema_id")?;
        client.reset_primary_keys(connection_id, schema_id).await?;
        info!(connection_id, schema_id, "Primary keys reset");
        Ok(())
    }

    async fn import(&self, client: &Client, id: &str) -> Result<Value, ProviderError> {
        let [org, connection_id, schema_id] = split_import_id::<3>(id, IMPORT_FORMAT)?;
        self.read(
            client,
            &json!({
                "organization": org,
                "connection_id": connection_id,
                "schema_id": schema_id,
            }),
        )
        .await
    }
}
