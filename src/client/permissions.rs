use serde::{Deserialize, Serialize};

use super::{segment, ApiError, Client};

/// A role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role ID.
    pub id: String,
    /// Role name.
    pub name: String,
    /// Owning organization.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Built in and read-only.
    #[serde(default)]
    pub system: bool,
}

/// Body for creating or updating a role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleRequest {
    /// Role name.
    pub name: String,
    /// Target organization; the caller's own when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

/// An action granted to a set of roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyAction {
    /// Action name, e.g. `read` or `apply_policy`.
    pub action: String,
    /// Roles granted the action.
    #[serde(default)]
    pub role_ids: Vec<String>,
}

/// A policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Policy ID.
    pub id: String,
    /// Policy name.
    pub name: String,
    /// Owning organization.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Actions and the roles holding them.
    #[serde(default)]
    pub policy_actions: Vec<PolicyAction>,
    /// Built in and read-only.
    #[serde(default)]
    pub system: bool,
}

/// Body for creating or updating a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyRequest {
    /// Policy name.
    pub name: String,
    /// Target organization; the caller's own when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    /// Actions and the roles holding them.
    pub policy_actions: Vec<PolicyAction>,
}

impl Client {
    /// `POST /api/permissions/roles`
    pub async fn create_role(&self, req: &RoleRequest) -> Result<Role, ApiError> {
        self.post("/api/permissions/roles", req).await
    }

    /// `GET /api/permissions/roles/{id}`
    pub async fn get_role(&self, id: &str) -> Result<Role, ApiError> {
        self.get(&format!("/api/permissions/roles/{}", segment(id)))
            .await
    }

    /// `PUT /api/permissions/roles/{id}`
    pub async fn update_role(&self, id: &str, req: &RoleRequest) -> Result<Role, ApiError> {
        self.put(&format!("/api/permissions/roles/{}", segment(id)), req)
            .await
    }

    /// `DELETE /api/permissions/roles/{id}`
    pub async fn delete_role(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/api/permissions/roles/{}", segment(id)))
            .await
    }

    /// `POST /api/permissions/policies`
    pub async fn create_policy(&self, req: &PolicyRequest) -> Result<Policy, ApiError> {
        self.post("/api/permissions/policies", req).await
    }

    /// `GET /api/permissions/policies/{id}`
    pub async fn get_policy(&self, id: &str) -> Result<Policy, ApiError> {
        self.get(&format!("/api/permissions/policies/{}", segment(id)))
            .await
    }

    /// `PUT /api/permissions/policies/{id}`
    pub async fn update_policy(&self, id: &str, req: &PolicyRequest) -> Result<Policy, ApiError> {
        self.put(&format!("/api/permissions/policies/{}", segment(id)), req)
            .await
    }

    /// `DELETE /api/permissions/policies/{id}`
    pub async fn delete_policy(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/api/permissions/policies/{}", segment(id)))
            .await
    }
}
