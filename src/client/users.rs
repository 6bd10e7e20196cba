use serde::{Deserialize, Serialize};

use super::{segment, ApiError, Client};

/// A user of an organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: String,
    /// Email, lowercased by the API.
    pub email: String,
    /// Owning organization.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Built-in role name.
    #[serde(default)]
    pub role: Option<String>,
    /// Custom roles held.
    #[serde(default)]
    pub role_ids: Vec<String>,
}

/// Body for creating or updating a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserRequest {
    /// Email address.
    pub email: String,
    /// Built-in role name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Custom roles to grant.
    pub role_ids: Vec<String>,
}

fn users_path(org: &str) -> String {
    format!("/api/organizations/{}/users", segment(org))
}

impl Client {
    /// Invite a user into `org`.
    pub async fn create_user(&self, org: &str, req: &UserRequest) -> Result<User, ApiError> {
        self.post(&users_path(org), req).await
    }

    /// One user of `org`.
    pub async fn get_user(&self, org: &str, id: &str) -> Result<User, ApiError> {
        self.get(&format!("{}/{}", users_path(org), segment(id)))
            .await
    }

    /// Change a user's roles.
    pub async fn update_user(
        &self,
        org: &str,
        id: &str,
        req: &UserRequest,
    ) -> Result<User, ApiError> {
        self.put(&format!("{}/{}", users_path(org), segment(id)), req)
            .await
    }

    /// Remove a user from `org`.
    pub async fn delete_user(&self, org: &str, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/{}", users_path(org), segment(id)))
            .await
    }
}
