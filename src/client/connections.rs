use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{segment, ApiError, Client};

/// Connection type reference as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionType {
    /// API type identifier, e.g. `postgresql`.
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Connection ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Owning organization.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// The connector behind the connection.
    #[serde(default, rename = "type")]
    pub connection_type: Option<ConnectionType>,
    /// Type-specific settings. Secrets come back masked.
    #[serde(default)]
    pub configuration: Map<String, Value>,
    /// Health reported by the last connection test.
    #[serde(default)]
    pub status: Option<String>,
    /// Why the last test failed, if it did.
    #[serde(default)]
    pub status_error: Option<String>,
}

/// Body for creating or updating a connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionRequest {
    /// Display name.
    pub name: String,
    /// API type identifier.
    #[serde(rename = "type")]
    pub connection_type: String,
    /// Target organization; the caller's own when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    /// Type-specific settings, secrets in clear.
    pub configuration: Map<String, Value>,
    /// Ask the API to test the connection before saving.
    pub validate: bool,
}

impl Client {
    /// `POST /api/connections`
    pub async fn create_connection(&self, req: &ConnectionRequest) -> Result<Connection, ApiError> {
        self.post("/api/connections", req).await
    }

    /// `GET /api/connections/{id}`
    pub async fn get_connection(&self, id: &str) -> Result<Connection, ApiError> {
        self.get(&format!("/api/connections/{}", segment(id))).await
    }

    /// `PUT /api/connections/{id}`
    pub async fn update_connection(
        &self,
        id: &str,
        req: &ConnectionRequest,
    ) -> Result<Connection, ApiError> {
        self.put(&format!("/api/connections/{}", segment(id)), req)
            .await
    }

    /// Delete a connection; `force` also removes the syncs and models using it.
    pub async fn delete_connection(&self, id: &str, force: bool) -> Result<(), ApiError> {
        let mut path = format!("/api/connections/{}", segment(id));
        if force {
            path.push_str("?force=true");
        }
        self.delete(&path).await
    }
}
