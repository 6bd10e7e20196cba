//! Managed resource types.
//!
//! Each resource implements [`Resource`]; the provider looks them up by type
//! name in the [`registry`]. Handlers receive plans and states as JSON values
//! and return the new state. A `NotFound` error from `read` removes the
//! resource from state, and from `delete` counts as success; the provider
//! handles both.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::client::Client;
use crate::error::ProviderError;
use crate::schema::{Diagnostic, Schema};
use crate::types::PlanResult;

mod bulk_sync;
mod bulk_sync_schema;
pub mod connection;
mod model;
mod notifications;
mod organization;
mod permissions;
mod primary_keys;
mod sync;
mod user;

pub use connection::{ConnectionKind, CATALOG};
pub(crate) use organization::organization_state;

/// Handlers for one resource type.
#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    /// The resource type name, e.g. `polytomic_model`.
    fn type_name(&self) -> String;

    /// The resource schema.
    fn schema(&self) -> Schema;

    /// Checks beyond what the schema expresses.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let _ = config;
        Vec::new()
    }

    /// Adjust the schema-computed plan.
    fn modify_plan(&self, plan: &mut PlanResult, prior: Option<&Value>) {
        let _ = (plan, prior);
    }

    /// Create the remote object and return its state.
    async fn create(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError>;

    /// Refresh the state from the API.
    async fn read(&self, client: &Client, state: &Value) -> Result<Value, ProviderError>;

    /// Apply a planned change and return the new state.
    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        plan: &Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the remote object.
    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError>;

    /// Import an existing object by its import ID.
    async fn import(&self, client: &Client, id: &str) -> Result<Value, ProviderError> {
        self.read(client, &json!({ "id": id })).await
    }
}

/// All resources keyed by type name.
pub fn registry() -> BTreeMap<String, Arc<dyn Resource>> {
    let mut resources: Vec<Arc<dyn Resource>> = vec![
        Arc::new(bulk_sync::BulkSyncResource),
        Arc::new(bulk_sync_schema::BulkSyncSchemaResource),
        Arc::new(model::ModelResource),
        Arc::new(sync::SyncResource),
        Arc::new(organization::OrganizationResource),
        Arc::new(user::UserResource),
        Arc::new(permissions::RoleResource),
        Arc::new(permissions::PolicyResource),
        Arc::new(notifications::GlobalErrorSubscribersResource),
        Arc::new(primary_keys::PrimaryKeysResource),
    ];
    resources.extend(
        CATALOG
            .iter()
            .map(|kind| Arc::new(connection::ConnectionResource::new(kind)) as Arc<dyn Resource>),
    );
    resources
        .into_iter()
        .map(|r| (r.type_name(), r))
        .collect()
}

/// Resolve the organization a resource belongs to.
///
/// Uses the configured value when present, otherwise the caller's own
/// organization.
pub(crate) async fn resolve_organization(
    client: &Client,
    configured: Option<&str>,
) -> Result<String, ProviderError> {
    if let Some(org) = configured.filter(|o| !o.is_empty()) {
        return Ok(org.to_string());
    }
    client.identity().await?.organization_id.ok_or_else(|| {
        ProviderError::Configuration(
            "organization must be set when the credential is not scoped to one".into(),
        )
    })
}

/// Split a composite import ID into exactly `N` non-empty parts.
pub(crate) fn split_import_id<const N: usize>(
    id: &str,
    format: &str,
) -> Result<[String; N], ProviderError> {
    let parts: Vec<String> = id.split('/').map(str::to_string).collect();
    if parts.iter().any(String::is_empty) {
        return Err(invalid_import(id, format));
    }
    parts.try_into().map_err(|_| invalid_import(id, format))
}

fn invalid_import(id: &str, format: &str) -> ProviderError {
    ProviderError::InvalidRequest(format!(
        "invalid import ID '{}', expected {}",
        id, format
    ))
}

/// A string list as state: null when empty and the prior state was null.
pub(crate) fn list_or_null(prior: Option<&Value>, items: Vec<Value>) -> Value {
    if items.is_empty() && prior.is_none_or(Value::is_null) {
        Value::Null
    } else {
        Value::Array(items)
    }
}

/// Strings as a JSON array.
pub(crate) fn strings(items: &[String]) -> Vec<Value> {
    items.iter().cloned().map(Value::String).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names() {
        let registry = registry();
        for name in [
            "polytomic_bulk_sync",
            "polytomic_bulk_sync_schema",
            "polytomic_model",
            "polytomic_sync",
            "polytomic_organization",
            "polytomic_user",
            "polytomic_role",
            "polytomic_policy",
            "polytomic_global_error_subscribers",
            "polytomic_primary_keys",
            "polytomic_postgresql_connection",
            "polytomic_googlesheets_connection",
        ] {
            assert!(registry.contains_key(name), "missing {}", name);
        }
        assert_eq!(registry.len(), 10 + CATALOG.len());
    }

    #[test]
    fn test_every_schema_has_id() {
        for (name, resource) in registry() {
            let schema = resource.schema();
            assert!(schema.attributes.contains_key("id"), "{} has no id", name);
            assert!(resource.validate(&Value::Null).is_empty(), "{}", name);
        }
    }

    #[test]
    fn test_split_import_id() {
        let [org, conn, schema] =
            split_import_id::<3>("o1/c1/public.users", "organization/connection_id/schema_id")
                .unwrap();
        assert_eq!((org.as_str(), conn.as_str(), schema.as_str()), ("o1", "c1", "public.users"));

        assert!(split_import_id::<3>("o1/c1", "x").is_err());
        assert!(split_import_id::<2>("b1//", "x").is_err());
        let err = split_import_id::<2>("b1", "bulk_sync_id/schema_id").unwrap_err();
        assert!(err.to_string().contains("bulk_sync_id/schema_id"));
    }

    #[test]
    fn test_list_or_null() {
        assert_eq!(list_or_null(None, vec![]), Value::Null);
        assert_eq!(list_or_null(Some(&json!([])), vec![]), json!([]));
        assert_eq!(list_or_null(None, vec![json!("a")]), json!(["a"]));
    }
}
