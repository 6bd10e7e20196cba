use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{segment, ApiError, Client};

/// A field of a connection schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Field ID.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Source type name.
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
    /// Part of the primary key.
    #[serde(default)]
    pub is_primary_key: bool,
}

/// A schema (table or object) exposed by a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSchema {
    /// Schema ID, usually `namespace.table`.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Fields of the schema.
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

impl ConnectionSchema {
    /// IDs of the fields flagged as primary keys.
    pub fn primary_keys(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.is_primary_key)
            .map(|f| f.id.clone())
            .collect()
    }
}

fn schema_path(connection_id: &str, schema_id: &str) -> String {
    format!(
        "/api/connections/{}/schemas/{}",
        segment(connection_id),
        segment(schema_id)
    )
}

impl Client {
    /// A schema with its fields and primary keys.
    pub async fn get_connection_schema(
        &self,
        connection_id: &str,
        schema_id: &str,
    ) -> Result<ConnectionSchema, ApiError> {
        self.get(&schema_path(connection_id, schema_id)).await
    }

    /// Override the primary keys of a schema.
    pub async fn set_primary_keys(
        &self,
        connection_id: &str,
        schema_id: &str,
        field_ids: &[String],
    ) -> Result<ConnectionSchema, ApiError> {
        let body = json!({
            "fields": field_ids.iter().map(|id| json!({"field_id": id})).collect::<Vec<_>>()
        });
        self.put(
            &format!("{}/primary_keys", schema_path(connection_id, schema_id)),
            &body,
        )
        .await
    }

    /// Revert a schema to its detected primary keys.
    pub async fn reset_primary_keys(
        &self,
        connection_id: &str,
        schema_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(&format!(
            "{}/primary_keys",
            schema_path(connection_id, schema_id)
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_set_primary_keys_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/connections/c1/schemas/public.users/primary_keys")
                    .json_body(json!({"fields": [{"field_id": "id"}, {"field_id": "tenant"}]}));
                then.status(200).json_body(json!({"data": {
                    "id": "public.users",
                    "fields": [
                        {"id": "id", "is_primary_key": true},
                        {"id": "email"},
                        {"id": "tenant", "is_primary_key": true}
                    ]
                }}));
            })
            .await;

        let client =
            Client::with_base_url(server.base_url(), Credential::ApiKey("k".into())).unwrap();
        let schema = client
            .set_primary_keys("c1", "public.users", &["id".into(), "tenant".into()])
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(schema.primary_keys(), vec!["id".to_string(), "tenant".to_string()]);
    }
}
