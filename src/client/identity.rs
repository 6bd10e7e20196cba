use serde::{Deserialize, Serialize};

use super::{ApiError, Client};

/// Who the configured credential belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User ID; absent for organization and partner keys.
    #[serde(default)]
    pub id: Option<String>,
    /// User email.
    #[serde(default)]
    pub email: Option<String>,
    /// The organization the credential acts in.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Display name of the organization.
    #[serde(default)]
    pub organization_name: Option<String>,
    /// The caller's role name.
    #[serde(default)]
    pub role: Option<String>,
    /// Set for partner keys.
    #[serde(default)]
    pub is_partner: bool,
    /// Set when the credential belongs to a user rather than an organization.
    #[serde(default)]
    pub is_user: bool,
}

impl Client {
    /// `GET /api/me`
    pub async fn identity(&self) -> Result<Identity, ApiError> {
        self.get("/api/me").await
    }
}
