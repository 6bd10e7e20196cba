use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::instrument;

use crate::client::Client;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, NestingMode, Schema};
use crate::value::require_str;

use super::DataSource;

/// The schemas of a bulk sync and their settings.
pub struct BulkSyncSchemasDataSource;

#[async_trait::async_trait]
impl DataSource for BulkSyncSchemasDataSource {
    fn type_name(&self) -> String {
        "polytomic_bulk_sync_schemas".to_string()
    }

    fn schema(&self) -> Schema {
        let mut schema_attrs = BTreeMap::new();
        schema_attrs.insert("id".to_string(), Attribute::computed_string());
        schema_attrs.insert("output_name".to_string(), Attribute::computed_string());
        schema_attrs.insert("enabled".to_string(), Attribute::computed_bool());
        schema_attrs.insert("partition_key".to_string(), Attribute::computed_string());
        schema_attrs.insert(
            "data_cutoff_timestamp".to_string(),
            Attribute::computed_string(),
        );
        Schema::v0()
            .with_description("Schemas available to a bulk sync")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("bulk_sync_id", Attribute::required_string())
            .with_attribute(
                "schemas",
                Attribute::nested(NestingMode::List, schema_attrs, AttributeFlags::computed()),
            )
    }

    #[instrument(skip_all, fields(data_source_type = "polytomic_bulk_sync_schemas"))]
    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        let bulk_sync_id = require_str(config, "bulk_sync_id")?;
        let schemas = client.list_bulk_sync_schemas(bulk_sync_id).await?;
        Ok(json!({
            "id": bulk_sync_id,
            "bulk_sync_id": bulk_sync_id,
            "schemas": schemas.iter().map(|s| json!({
                "id": s.id,
                "output_name": s.output_name,
                "enabled": s.enabled.unwrap_or(false),
                "partition_key": s.partition_key,
                "data_cutoff_timestamp": s.data_cutoff_timestamp,
            })).collect::<Vec<_>>(),
        }))
    }
}
