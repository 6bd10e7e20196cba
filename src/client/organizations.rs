use serde::{Deserialize, Serialize};

use super::{segment, ApiError, Client};

/// An organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email domain routed to single sign-on.
    #[serde(default)]
    pub sso_domain: Option<String>,
    /// Organization ID at the SSO provider.
    #[serde(default)]
    pub sso_org_id: Option<String>,
    /// OIDC issuer URL.
    #[serde(default)]
    pub issuer: Option<String>,
    /// OIDC client ID.
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Body for creating or updating an organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrganizationRequest {
    /// Display name.
    pub name: String,
    /// See [`Organization::sso_domain`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sso_domain: Option<String>,
    /// See [`Organization::sso_org_id`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sso_org_id: Option<String>,
    /// See [`Organization::issuer`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// See [`Organization::client_id`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Write-only; never returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl Client {
    /// `POST /api/organizations`
    pub async fn create_organization(
        &self,
        req: &OrganizationRequest,
    ) -> Result<Organization, ApiError> {
        self.post("/api/organizations", req).await
    }

    /// `GET /api/organizations/{id}`
    pub async fn get_organization(&self, id: &str) -> Result<Organization, ApiError> {
        self.get(&format!("/api/organizations/{}", segment(id)))
            .await
    }

    /// `PUT /api/organizations/{id}`
    pub async fn update_organization(
        &self,
        id: &str,
        req: &OrganizationRequest,
    ) -> Result<Organization, ApiError> {
        self.put(&format!("/api/organizations/{}", segment(id)), req)
            .await
    }

    /// `DELETE /api/organizations/{id}`
    pub async fn delete_organization(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/api/organizations/{}", segment(id)))
            .await
    }
}
