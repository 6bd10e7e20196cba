//! Roles and policies.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::client::{Client, Policy, PolicyAction, PolicyRequest, Role, RoleRequest};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, NestingMode, Schema, StringValidator};
use crate::state_merge::{key_by, populate_unknown, reconcile_set, refresh_set};
use crate::value::{from_state, require_str, set_attr};

use super::{strings, Resource};

#[derive(Debug, Deserialize)]
struct RoleModel {
    organization: Option<String>,
    name: String,
}

fn role_state(role: &Role) -> Value {
    json!({
        "id": role.id,
        "organization": role.organization_id,
        "name": role.name,
    })
}

/// `polytomic_role`.
pub struct RoleResource;

#[async_trait::async_trait]
impl Resource for RoleResource {
    fn type_name(&self) -> String {
        "polytomic_role".to_string()
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A role users can be granted")
            .with_attribute("id", Attribute::id())
            .with_attribute("organization", Attribute::organization())
            .with_attribute(
                "name",
                Attribute::required_string().with_validator(StringValidator::ValidName),
            )
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_role"))]
    async fn create(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError> {
        let model: RoleModel = from_state(plan)?;
        let role = client
            .create_role(&RoleRequest {
                name: model.name,
                organization_id: model.organization,
            })
            .await?;
        info!(id = %role.id, "Role created");
        Ok(populate_unknown(plan, &role_state(&role)))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_role"))]
    async fn read(&self, client: &Client, state: &Value) -> Result<Value, ProviderError> {
        let role = client.get_role(require_str(state, "id")?).await?;
        Ok(role_state(&role))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_role"))]
    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        plan: &Value,
    ) -> Result<Value, ProviderError> {
        let id = require_str(prior, "id")?;
        let model: RoleModel = from_state(plan)?;
        let role = client
            .update_role(
                id,
                &RoleRequest {
                    name: model.name,
                    organization_id: model.organization,
                },
            )
            .await?;
        Ok(populate_unknown(plan, &role_state(&role)))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_role"))]
    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        let id = require_str(state, "id")?;
        client.delete_role(id).await?;
        info!(id, "Role deleted");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ActionModel {
    action: String,
    role_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PolicyModel {
    organization: Option<String>,
    name: String,
    policy_actions: Vec<ActionModel>,
}

impl PolicyModel {
    fn request(self) -> PolicyRequest {
        PolicyRequest {
            name: self.name,
            organization_id: self.organization,
            policy_actions: self
                .policy_actions
                .into_iter()
                .map(|a| PolicyAction {
                    action: a.action,
                    role_ids: a.role_ids,
                })
                .collect(),
        }
    }
}

fn policy_state(policy: &Policy) -> Value {
    json!({
        "id": policy.id,
        "organization": policy.organization_id,
        "name": policy.name,
        "policy_actions": policy.policy_actions.iter().map(|a| json!({
            "action": a.action,
            "role_ids": strings(&a.role_ids),
        })).collect::<Vec<_>>(),
    })
}

/// `polytomic_policy`.
pub struct PolicyResource;

impl PolicyResource {
    fn applied_state(plan: &Value, policy: &Policy) -> Value {
        let api = policy_state(policy);
        let mut state = populate_unknown(plan, &api);
        let actions = reconcile_set(
            &plan["policy_actions"],
            &api["policy_actions"],
            key_by("action"),
        );
        set_attr(&mut state, "policy_actions", actions);
        state
    }
}

#[async_trait::async_trait]
impl Resource for PolicyResource {
    fn type_name(&self) -> String {
        "polytomic_policy".to_string()
    }

    fn schema(&self) -> Schema {
        let mut action = BTreeMap::new();
        action.insert("action".to_string(), Attribute::required_string());
        action.insert(
            "role_ids".to_string(),
            Attribute::string_set(AttributeFlags::required()),
        );
        Schema::v0()
            .with_description("A policy granting actions to roles")
            .with_attribute("id", Attribute::id())
            .with_attribute("organization", Attribute::organization())
            .with_attribute(
                "name",
                Attribute::required_string().with_validator(StringValidator::ValidName),
            )
            .with_attribute(
                "policy_actions",
                Attribute::nested(NestingMode::Set, action, AttributeFlags::required()),
            )
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_policy"))]
    async fn create(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError> {
        let model: PolicyModel = from_state(plan)?;
        let policy = client.create_policy(&model.request()).await?;
        info!(id = %policy.id, "Policy created");
        Ok(Self::applied_state(plan, &policy))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_policy"))]
    async fn read(&self, client: &Client, state: &Value) -> Result<Value, ProviderError> {
        let policy = client.get_policy(require_str(state, "id")?).await?;
        let mut current = policy_state(&policy);
        let actions = refresh_set(
            &state["policy_actions"],
            &current["policy_actions"],
            key_by("action"),
        );
        set_attr(&mut current, "policy_actions", actions);
        Ok(current)
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_policy"))]
    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        plan: &Value,
    ) -> Result<Value, ProviderError> {
        let id = require_str(prior, "id")?;
        let model: PolicyModel = from_state(plan)?;
        let policy = client.update_policy(id, &model.request()).await?;
        Ok(Self::applied_state(plan, &policy))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_policy"))]
    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        let id = require_str(state, "id")?;
        client.delete_policy(id).await?;
        info!(id, "Policy deleted");
        Ok(())
    }
}
