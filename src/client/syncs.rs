use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::bulk_sync::Schedule;
use super::{segment, ApiError, Client};

/// Where a model sync writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncTarget {
    /// Connection written to.
    pub connection_id: String,
    /// Target object; unset when the sync creates one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    /// Name of the object to create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    /// Target-specific settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Map<String, Value>>,
}

/// A model field used as a sync source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSource {
    /// Model the field belongs to.
    pub model_id: String,
    /// Field name in the model.
    pub field: String,
}

/// One mapping from a model field to a target field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncField {
    /// Target field name.
    pub target: String,
    /// Model field written to the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SyncSource>,
    /// Constant written instead of a model field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_value: Option<String>,
    /// Create the target field.
    #[serde(default)]
    pub new: bool,
    /// Per-field mode, e.g. `updateOnly`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_mode: Option<String>,
}

/// A record filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncFilter {
    /// Model field ID.
    pub field_id: String,
    /// Type of the compared field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    /// Comparison, e.g. `Equality`.
    pub function: String,
    /// Operand, when the function takes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// How source records are matched to target records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncIdentity {
    /// Model field compared.
    pub source: SyncSource,
    /// Target field compared.
    pub target: String,
    /// Comparison, e.g. `Equality`.
    pub function: String,
    /// Create the target field.
    #[serde(default)]
    pub new_field: bool,
}

/// A model sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSync {
    /// Sync ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Owning organization.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Where the sync writes.
    pub target: SyncTarget,
    pub mode: String,
    /// When the sync runs.
    #[serde(default)]
    pub schedule: Schedule,
    /// Field mappings.
    #[serde(default)]
    pub fields: Vec<SyncField>,
    /// Mappings that override target values on every run.
    #[serde(default)]
    pub override_fields: Vec<SyncField>,
    /// Record filters.
    #[serde(default)]
    pub filters: Vec<SyncFilter>,
    /// How filters combine, e.g. `1 AND (2 OR 3)`.
    #[serde(default)]
    pub filter_logic: Option<String>,
    /// How records are matched; unset for append-only modes.
    #[serde(default)]
    pub identity: Option<SyncIdentity>,
    /// Whether scheduled runs are enabled.
    #[serde(default)]
    pub active: bool,
    /// Resync every record on the next run.
    #[serde(default)]
    pub sync_all_records: bool,
    /// IDs of the attached policies.
    #[serde(default)]
    pub policies: Vec<String>,
}

/// Body for creating or updating a model sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncRequest {
    /// Display name.
    pub name: String,
    /// Target organization; the caller's own when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    /// Where the sync writes.
    pub target: SyncTarget,
    pub mode: String,
    /// When the sync runs.
    pub schedule: Schedule,
    /// Field mappings.
    pub fields: Vec<SyncField>,
    /// Override mappings.
    pub override_fields: Vec<SyncField>,
    /// Record filters.
    pub filters: Vec<SyncFilter>,
    /// How filters combine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_logic: Option<String>,
    /// How records are matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<SyncIdentity>,
    /// Enable scheduled runs.
    pub active: bool,
    /// Resync every record on the next run.
    pub sync_all_records: bool,
    /// Policies to attach.
    pub policies: Vec<String>,
}

impl Client {
    /// `POST /api/syncs`
    pub async fn create_sync(&self, req: &SyncRequest) -> Result<ModelSync, ApiError> {
        self.post("/api/syncs", req).await
    }

    /// `GET /api/syncs/{id}`
    pub async fn get_sync(&self, id: &str) -> Result<ModelSync, ApiError> {
        self.get(&format!("/api/syncs/{}", segment(id))).await
    }

    /// `PUT /api/syncs/{id}`
    pub async fn update_sync(&self, id: &str, req: &SyncRequest) -> Result<ModelSync, ApiError> {
        self.put(&format!("/api/syncs/{}", segment(id)), req).await
    }

    /// `DELETE /api/syncs/{id}`
    pub async fn delete_sync(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/api/syncs/{}", segment(id))).await
    }
}
