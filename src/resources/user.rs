//! `polytomic_user`: a member of an organization.
//!
//! Emails are case-insensitive in the API and always stored lowercase; a
//! configuration differing from state only in case plans no change.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::client::{Client, User, UserRequest};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, Schema, StringValidator};
use crate::state_merge::populate_unknown;
use crate::types::{AttributeChange, PlanResult};
use crate::value::{from_state, get_str, is_unknown, require_str, set_attr};

use super::{resolve_organization, strings, Resource};

#[derive(Debug, Deserialize)]
struct UserModel {
    organization: Option<String>,
    email: String,
    role: Option<String>,
    role_ids: Option<Vec<String>>,
}

impl UserModel {
    fn request(&self) -> UserRequest {
        UserRequest {
            email: self.email.to_lowercase(),
            role: self.role.clone(),
            role_ids: self.role_ids.clone().unwrap_or_default(),
        }
    }
}

fn state_from_api(org: &str, user: &User) -> Value {
    json!({
        "id": user.id,
        "organization": user.organization_id.as_deref().unwrap_or(org),
        "email": user.email.to_lowercase(),
        "role": user.role,
        "role_ids": strings(&user.role_ids),
    })
}

/// User resource.
pub struct UserResource;

#[async_trait::async_trait]
impl Resource for UserResource {
    fn type_name(&self) -> String {
        "polytomic_user".to_string()
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A user of an organization")
            .with_attribute("id", Attribute::id())
            .with_attribute("organization", Attribute::organization())
            .with_attribute(
                "email",
                Attribute::required_string().with_validator(StringValidator::Email),
            )
            .with_attribute("role", Attribute::optional_computed_string())
            .with_attribute(
                "role_ids",
                Attribute::string_set(AttributeFlags::optional_computed()),
            )
    }

    fn modify_plan(&self, plan: &mut PlanResult, prior: Option<&Value>) {
        let Some(email) = get_str(&plan.planned_state, "email").map(str::to_lowercase) else {
            return;
        };
        set_attr(&mut plan.planned_state, "email", json!(email));

        let Some(prior) = prior.filter(|p| !p.is_null()) else {
            return;
        };
        let same_email = |change: &AttributeChange| {
            change.path == "email"
                && change
                    .before
                    .as_ref()
                    .and_then(Value::as_str)
                    .map(str::to_lowercase)
                    .as_deref()
                    == Some(email.as_str())
        };
        // Unknowns planned only because of the case difference go away with it.
        let case_only = plan.changes.iter().all(|change| {
            same_email(change) || change.after.as_ref().is_some_and(is_unknown)
        });
        if case_only {
            *plan = PlanResult::no_change(prior.clone());
        } else {
            plan.changes.retain(|change| !same_email(change));
        }
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_user"))]
    async fn create(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError> {
        let model: UserModel = from_state(plan)?;
        let org = resolve_organization(client, model.organization.as_deref()).await?;
        let user = client.create_user(&org, &model.request()).await?;
        info!(id = %user.id, organization = %org, "User created");
        Ok(populate_unknown(plan, &state_from_api(&org, &user)))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_user"))]
    async fn read(&self, client: &Client, state: &Value) -> Result<Value, ProviderError> {
        let id = require_str(state, "id")?;
        let org = resolve_organization(client, get_str(state, "organization")).await?;
        let user = client.get_user(&org, id).await?;
        Ok(state_from_api(&org, &user))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_user"))]
    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        plan: &Value,
    ) -> Result<Value, ProviderError> {
        let id = require_str(prior, "id")?;
        let model: UserModel = from_state(plan)?;
        let org = resolve_organization(
            client,
            model
                .organization
                .as_deref()
                .or_else(|| get_str(prior, "organization")),
        )
        .await?;
        let user = client.update_user(&org, id, &model.request()).await?;
        info!(id = %user.id, "User updated");
        Ok(populate_unknown(plan, &state_from_api(&org, &user)))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_user"))]
    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        let id = require_str(state, "id")?;
        let org = resolve_organization(client, get_str(state, "organization")).await?;
        client.delete_user(&org, id).await?;
        info!(id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use crate::plan::plan_resource;
    use httpmock::prelude::*;

    #[test]
    fn test_modify_plan_lowercases_email() {
        let schema = UserResource.schema();
        let mut plan = plan_resource(&schema, None, &json!({"email": "Ada@Example.com"}));
        UserResource.modify_plan(&mut plan, None);
        assert_eq!(plan.planned_state["email"], "ada@example.com");
    }

    #[test]
    fn test_case_only_change_is_no_op() {
        let schema = UserResource.schema();
        let prior = json!({
            "id": "u1",
            "organization": "o1",
            "email": "ada@example.com",
            "role": "admin",
            "role_ids": []
        });
        let config = json!({"email": "Ada@Example.com", "organization": "o1"});
        let mut plan = plan_resource(&schema, Some(&prior), &config);
        assert!(plan.has_changes());
        UserResource.modify_plan(&mut plan, Some(&prior));
        assert!(!plan.has_changes());
        assert_eq!(plan.planned_state, prior);
    }

    #[tokio::test]
    async fn test_import_resolves_caller_organization() {
        let server = MockServer::start_async().await;
        let me = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/me");
                then.status(200)
                    .json_body(json!({"data": {"organization_id": "o1"}}));
            })
            .await;
        let get = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/organizations/o1/users/u1");
                then.status(200).json_body(json!({"data": {
                    "id": "u1",
                    "email": "Ada@Example.com",
                    "role": "admin"
                }}));
            })
            .await;
        let client =
            Client::with_base_url(server.base_url(), Credential::ApiKey("k".into())).unwrap();

        let state = UserResource.import(&client, "u1").await.unwrap();
        me.assert_async().await;
        get.assert_async().await;
        assert_eq!(state["organization"], "o1");
        assert_eq!(state["email"], "ada@example.com");
        assert_eq!(state["role_ids"], json!([]));
    }
}
