use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{segment, ApiError, Client};

/// A model field, discovered from the source or added by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelField {
    /// Field name.
    pub name: String,
    /// Field type name, e.g. `string`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Field ID assigned by the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name of the column in the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_name: Option<String>,
    /// Added by the user rather than discovered.
    #[serde(default)]
    pub user_added: bool,
}

/// A model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Model ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Owning organization.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// The source connection.
    pub connection_id: String,
    #[serde(default, rename = "type")]
    pub model_type: Option<String>,
    /// Incremented on each change.
    #[serde(default)]
    pub version: Option<i64>,
    /// Source-specific settings, e.g. a query or a table.
    #[serde(default)]
    pub configuration: Map<String, Value>,
    /// Discovered and user-added fields.
    #[serde(default)]
    pub fields: Vec<ModelField>,
    /// The field that identifies a record.
    #[serde(default)]
    pub identifier: Option<String>,
    /// Columns used to detect changed records.
    #[serde(default)]
    pub tracking_columns: Vec<String>,
    /// Free-form labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// IDs of the policies attached to the model.
    #[serde(default)]
    pub policies: Vec<String>,
}

/// Body for creating or updating a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelRequest {
    /// Display name.
    pub name: String,
    /// Target organization; the caller's own when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    /// The source connection.
    pub connection_id: String,
    /// Source-specific settings.
    pub configuration: Map<String, Value>,
    /// Source fields to include; empty means all.
    pub fields: Vec<String>,
    /// Fields the source does not report.
    pub additional_fields: Vec<ModelField>,
    /// The field that identifies a record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Columns used to detect changed records.
    pub tracking_columns: Vec<String>,
    /// Free-form labels.
    pub labels: Vec<String>,
    /// Policies to attach.
    pub policies: Vec<String>,
}

impl Client {
    /// `POST /api/models`
    pub async fn create_model(&self, req: &ModelRequest) -> Result<Model, ApiError> {
        self.post("/api/models", req).await
    }

    /// `GET /api/models/{id}`
    pub async fn get_model(&self, id: &str) -> Result<Model, ApiError> {
        self.get(&format!("/api/models/{}", segment(id))).await
    }

    /// `PUT /api/models/{id}`
    pub async fn update_model(&self, id: &str, req: &ModelRequest) -> Result<Model, ApiError> {
        self.put(&format!("/api/models/{}", segment(id)), req).await
    }

    /// `DELETE /api/models/{id}`
    pub async fn delete_model(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/api/models/{}", segment(id))).await
    }
}
