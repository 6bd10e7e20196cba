//! Typed REST client for the Polytomic API.
//!
//! One [`Client`] per configured provider. Each resource family lives in its
//! own submodule as an `impl Client` block plus its request/response types.
//! Successful responses are wrapped in a `{"data": ...}` envelope; errors carry
//! a status, a message, and optional metadata.
//!
//! SECURITY: neither errors nor `Debug` output may contain the credential.

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::{Credential, ResolvedConfig};

/// Bulk syncs and their schemas.
pub mod bulk_sync;
/// Connections.
pub mod connections;
/// The caller's identity.
pub mod identity;
/// Models.
pub mod models;
/// Notification settings.
pub mod notifications;
/// Organizations (partner and deployment keys only).
pub mod organizations;
/// Roles and policies.
pub mod permissions;
/// Connection schemas and primary keys.
pub mod schemas;
/// Model syncs.
pub mod syncs;
/// Organization users.
pub mod users;

pub use bulk_sync::{BulkField, BulkSchema, BulkSync, BulkSyncRequest, Schedule};
pub use connections::{Connection, ConnectionRequest, ConnectionType};
pub use identity::Identity;
pub use models::{Model, ModelField, ModelRequest};
pub use notifications::GlobalErrorSubscribers;
pub use organizations::{Organization, OrganizationRequest};
pub use permissions::{Policy, PolicyAction, PolicyRequest, Role, RoleRequest};
pub use schemas::{ConnectionSchema, SchemaField};
pub use syncs::{
    ModelSync, SyncField, SyncFilter, SyncIdentity, SyncRequest, SyncSource, SyncTarget,
};
pub use users::{User, UserRequest};

/// API version sent with every request.
pub const API_VERSION: &str = "2024-02-08";

const API_VERSION_HEADER: &str = "X-Polytomic-Version";

/// Errors returned by the REST client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the status reason.
        message: String,
        /// Structured details, such as the objects blocking a delete.
        metadata: Option<Value>,
    },

    /// Connection failure, timeout, or similar.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The credential cannot be sent as a header.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
}

impl ApiError {
    /// HTTP status, when the API answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The bare message without the status prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether this is a 422 refusing to remove an object others depend on.
    pub fn is_in_use(&self) -> bool {
        match self {
            Self::Status {
                status: 422,
                message,
                metadata,
            } => {
                message.to_lowercase().contains("in use")
                    || metadata
                        .as_ref()
                        .and_then(|m| m.get("used_by"))
                        .is_some_and(|u| u.as_array().is_some_and(|a| !a.is_empty()))
            },
            _ => false,
        }
    }

    /// Descriptions of the objects blocking the operation.
    pub fn used_by(&self) -> Vec<String> {
        let Self::Status {
            metadata: Some(metadata),
            ..
        } = self
        else {
            return Vec::new();
        };
        metadata
            .get("used_by")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(describe_user).collect())
            .unwrap_or_default()
    }
}

fn describe_user(item: &Value) -> Option<String> {
    if let Some(s) = item.as_str() {
        return Some(s.to_string());
    }
    let id = item.get("id").and_then(Value::as_str)?;
    let name = item.get("name").and_then(Value::as_str);
    let kind = item.get("type").and_then(Value::as_str);
    Some(match (kind, name) {
        (Some(kind), Some(name)) => format!("{} \"{}\" ({})", kind, name, id),
        (None, Some(name)) => format!("\"{}\" ({})", name, id),
        (Some(kind), None) => format!("{} ({})", kind, id),
        (None, None) => id.to_string(),
    })
}

/// Client for the Polytomic REST API.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    credential: Credential,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("credential", &self.credential)
            .finish()
    }
}

impl Client {
    /// Build a client from resolved provider configuration.
    pub fn new(config: &ResolvedConfig) -> Result<Self, ApiError> {
        Self::with_base_url(config.base_url.clone(), config.credential.clone())
    }

    /// Build a client against an explicit base URL, e.g. a mock server.
    pub fn with_base_url(
        base_url: impl Into<String>,
        credential: Credential,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!(
                "terraform-provider-polytomic/",
                env!("CARGO_PKG_VERSION")
            )),
        );

        let token = match &credential {
            Credential::ApiKey(k) | Credential::PartnerKey(k) | Credential::DeploymentKey(k) => k,
        };
        HeaderValue::from_str(token)
            .map_err(|_| ApiError::InvalidCredential("key contains invalid characters".into()))?;

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential,
        })
    }

    /// The API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The credential in use.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "API request");
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.credential {
            Credential::ApiKey(key) | Credential::PartnerKey(key) => builder.bearer_auth(key),
            Credential::DeploymentKey(key) => builder.basic_auth(key, None::<&str>),
        }
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        send(self.request(Method::GET, path)).await
    }

    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        send(self.request(Method::POST, path).json(body)).await
    }

    pub(crate) async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        send(self.request(Method::PUT, path).json(body)).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = self.request(Method::DELETE, path).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await?;
        Err(error_from_body(status, &body))
    }
}

async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
    let response = builder.send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(error_from_body(status, &body));
    }
    decode_body(&body)
}

/// Decode a success body, unwrapping the `data` envelope when present.
pub(crate) fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let value: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))?
    };
    let data = match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        },
        other => other,
    };
    serde_json::from_value(data).map_err(|e| ApiError::Decode(e.to_string()))
}

fn error_from_body(status: reqwest::StatusCode, body: &[u8]) -> ApiError {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
        })
        .map(str::to_string)
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty() && parsed.is_none()).then_some(text)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
    let metadata = parsed
        .as_ref()
        .and_then(|v| v.get("metadata"))
        .filter(|m| !m.is_null())
        .cloned();

    ApiError::Status {
        status: status.as_u16(),
        message,
        metadata,
    }
}

/// Percent-encode a path segment.
pub(crate) fn segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            },
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}
