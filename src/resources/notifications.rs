//! `polytomic_global_error_subscribers`: a singleton per organization.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::client::{Client, GlobalErrorSubscribers};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, Schema, StringValidator};
use crate::state_merge::populate_unknown;
use crate::value::{from_state, get_str, require_str};

use super::{resolve_organization, strings, Resource};

#[derive(Debug, Deserialize)]
struct SubscribersModel {
    organization: Option<String>,
    emails: Vec<String>,
}

fn state(org: &str, subscribers: &GlobalErrorSubscribers) -> Value {
    json!({
        "id": org,
        "organization": org,
        "emails": strings(&subscribers.emails),
    })
}

/// Global error subscribers resource.
pub struct GlobalErrorSubscribersResource;

impl GlobalErrorSubscribersResource {
    async fn apply(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError> {
        let model: SubscribersModel = from_state(plan)?;
        let org = resolve_organization(client, model.organization.as_deref()).await?;
        let subscribers = client
            .set_global_error_subscribers(&GlobalErrorSubscribers {
                emails: model.emails,
            })
            .await?;
        info!(organization = %org, count = subscribers.emails.len(), "Global error subscribers set");
        Ok(populate_unknown(plan, &state(&org, &subscribers)))
    }
}

#[async_trait::async_trait]
impl Resource for GlobalErrorSubscribersResource {
    fn type_name(&self) -> String {
        "polytomic_global_error_subscribers".to_string()
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Addresses notified of every sync error in the organization")
            .with_attribute(
                "id",
                Attribute::id().with_description("The organization ID"),
            )
            .with_attribute("organization", Attribute::organization())
            .with_attribute(
                "emails",
                Attribute::string_set(AttributeFlags::required())
                    .with_validator(StringValidator::Email),
            )
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_global_error_subscribers"))]
    async fn create(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError> {
        self.apply(client, plan).await
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_global_error_subscribers"))]
    async fn read(&self, client: &Client, current: &Value) -> Result<Value, ProviderError> {
        let org = resolve_organization(
            client,
            get_str(current, "organization").or_else(|| get_str(current, "id")),
        )
        .await?;
        let subscribers = client.get_global_error_subscribers().await?;
        Ok(state(&org, &subscribers))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_global_error_subscribers"))]
    async fn update(
        &self,
        client: &Client,
        _prior: &Value,
        plan: &Value,
    ) -> Result<Value, ProviderError> {
        self.apply(client, plan).await
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_global_error_subscribers"))]
    async fn delete(&self, client: &Client, current: &Value) -> Result<(), ProviderError> {
        let org = require_str(current, "id")?;
        client
            .set_global_error_subscribers(&GlobalErrorSubscribers::default())
            .await?;
        info!(organization = org, "Global error subscribers cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use crate::validation::validate;
    use httpmock::prelude::*;

    #[test]
    fn test_emails_are_validated() {
        let diagnostics = validate(
            &GlobalErrorSubscribersResource.schema(),
            &json!({"emails": ["ops@example.com", "not-an-email"]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("emails.1"));
    }

    #[tokio::test]
    async fn test_delete_clears_list() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/notifications/global-error-subscribers")
                    .json_body(json!({"emails": []}));
                then.status(200).json_body(json!({"data": {"emails": []}}));
            })
            .await;
        let client =
            Client::with_base_url(server.base_url(), Credential::ApiKey("k".into())).unwrap();

        GlobalErrorSubscribersResource
            .delete(&client, &json!({"id": "o1", "emails": ["ops@example.com"]}))
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
