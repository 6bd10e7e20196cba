use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{segment, ApiError, Client};

/// When a sync runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// One of the frequencies accepted by the API, e.g. `daily`.
    pub frequency: String,
    /// Day name for weekly schedules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<String>,
    /// Hour of day, UTC, as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<String>,
    /// Minute of the hour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<String>,
    /// Month for yearly schedules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    /// Day of the month.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<String>,
}

/// Per-field settings inside a bulk sync schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkField {
    /// Field ID within the schema.
    pub id: String,
    /// Whether the field is synced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Hash the field's values in the destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfuscated: Option<bool>,
}

/// A source schema (table/object) inside a bulk sync.
///
/// Used both as the API's answer and as the body of a schema update. Unset
/// fields are left out of the body so the API keeps their current values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSchema {
    /// Schema ID, usually `namespace.table`.
    pub id: String,
    /// Whether the schema is synced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Column used to partition the destination table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,
    /// Table name in the destination, when it differs from the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    /// Only records newer than this RFC 3339 timestamp are synced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_cutoff_timestamp: Option<String>,
    /// Sync the whole history regardless of the cutoff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_data_cutoff: Option<bool>,
    /// Field selection; `None` leaves the remote selection untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<BulkField>>,
}

/// A bulk sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkSync {
    /// Bulk sync ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Owning organization.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Whether scheduled runs are enabled.
    #[serde(default)]
    pub active: bool,
    /// `replicate` or `snapshot`.
    #[serde(default)]
    pub mode: Option<String>,
    /// Connection read from.
    pub source_connection_id: String,
    /// Connection written to.
    pub destination_connection_id: String,
    /// Source-specific settings.
    #[serde(default)]
    pub source_configuration: Option<Map<String, Value>>,
    /// Destination-specific settings, e.g. the target schema.
    #[serde(default)]
    pub destination_configuration: Option<Map<String, Value>>,
    /// When the sync runs.
    #[serde(default)]
    pub schedule: Schedule,
    /// Discover new source schemas on each run.
    #[serde(default)]
    pub discover: bool,
    /// How schemas that appear later are handled: `all`, `none` or `onlyNew`.
    #[serde(default)]
    pub automatically_add_new_objects: Option<String>,
    /// How fields that appear later are handled.
    #[serde(default)]
    pub automatically_add_new_fields: Option<String>,
    /// Skip the `_polytomic_*` timestamp columns.
    #[serde(default)]
    pub disable_record_timestamps: bool,
    /// IDs of the policies attached to the sync.
    #[serde(default)]
    pub policies: Vec<String>,
    /// Every schema the source exposes, enabled or not.
    #[serde(default)]
    pub schemas: Vec<BulkSchema>,
}

/// Body for creating or updating a bulk sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkSyncRequest {
    /// Display name.
    pub name: String,
    /// Target organization; the caller's own when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    /// Enable scheduled runs.
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Connection read from.
    pub source_connection_id: String,
    /// Connection written to.
    pub destination_connection_id: String,
    /// Source-specific settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_configuration: Option<Map<String, Value>>,
    /// Destination-specific settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_configuration: Option<Map<String, Value>>,
    /// When the sync runs.
    pub schedule: Schedule,
    /// Discover new schemas on each run.
    pub discover: bool,
    /// See [`BulkSync::automatically_add_new_objects`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automatically_add_new_objects: Option<String>,
    /// See [`BulkSync::automatically_add_new_fields`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automatically_add_new_fields: Option<String>,
    /// Skip the timestamp columns.
    pub disable_record_timestamps: bool,
    /// Policies to attach.
    pub policies: Vec<String>,
    /// Omitted to leave schema selection untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<Vec<BulkSchema>>,
}

impl Client {
    /// `POST /api/bulk/syncs`
    pub async fn create_bulk_sync(&self, req: &BulkSyncRequest) -> Result<BulkSync, ApiError> {
        self.post("/api/bulk/syncs", req).await
    }

    /// `GET /api/bulk/syncs/{id}`
    pub async fn get_bulk_sync(&self, id: &str) -> Result<BulkSync, ApiError> {
        self.get(&format!("/api/bulk/syncs/{}", segment(id))).await
    }

    /// `PUT /api/bulk/syncs/{id}`
    pub async fn update_bulk_sync(
        &self,
        id: &str,
        req: &BulkSyncRequest,
    ) -> Result<BulkSync, ApiError> {
        self.put(&format!("/api/bulk/syncs/{}", segment(id)), req)
            .await
    }

    /// `DELETE /api/bulk/syncs/{id}`
    pub async fn delete_bulk_sync(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/api/bulk/syncs/{}", segment(id)))
            .await
    }

    /// Every schema of a bulk sync, enabled or not.
    pub async fn list_bulk_sync_schemas(&self, id: &str) -> Result<Vec<BulkSchema>, ApiError> {
        self.get(&format!("/api/bulk/syncs/{}/schemas", segment(id)))
            .await
    }

    /// One schema of a bulk sync.
    pub async fn get_bulk_sync_schema(
        &self,
        id: &str,
        schema_id: &str,
    ) -> Result<BulkSchema, ApiError> {
        self.get(&format!(
            "/api/bulk/syncs/{}/schemas/{}",
            segment(id),
            segment(schema_id)
        ))
        .await
    }

    /// Replace the settings of one schema; `schema.id` selects it.
    pub async fn update_bulk_sync_schema(
        &self,
        id: &str,
        schema: &BulkSchema,
    ) -> Result<BulkSchema, ApiError> {
        self.put(
            &format!(
                "/api/bulk/syncs/{}/schemas/{}",
                segment(id),
                segment(&schema.id)
            ),
            schema,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_schemas() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/bulk/syncs/b1/schemas");
                then.status(200).json_body(json!({"data": [
                    {"id": "public.users", "enabled": true, "fields": [{"id": "email", "enabled": true}]},
                    {"id": "public.orders", "enabled": false}
                ]}));
            })
            .await;

        let client =
            Client::with_base_url(server.base_url(), Credential::ApiKey("k".into())).unwrap();
        let schemas = client.list_bulk_sync_schemas("b1").await.unwrap();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].fields.as_deref().unwrap()[0].id, "email");
        assert!(schemas[1].fields.is_none());
    }

    #[test]
    fn test_request_omits_unset_schemas() {
        let req = BulkSyncRequest {
            name: "copy".into(),
            source_connection_id: "s".into(),
            destination_connection_id: "d".into(),
            schedule: Schedule {
                frequency: "manual".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let body = serde_json::to_value(&req).unwrap();
        assert!(body.get("schemas").is_none());
        assert_eq!(body["schedule"], json!({"frequency": "manual"}));
    }

    #[test]
    fn test_schema_body_omits_unset_settings() {
        let schema = BulkSchema {
            id: "public.users".into(),
            enabled: Some(false),
            ..Default::default()
        };
        let body = serde_json::to_value(&schema).unwrap();
        assert_eq!(body, json!({"id": "public.users", "enabled": false}));
    }
}
