//! `polytomic_organization`: requires a partner or deployment credential.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::client::{Client, Organization, OrganizationRequest};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema, StringValidator};
use crate::state_merge::{populate_unknown, preserve_sensitive};
use crate::value::{from_state, require_str};

use super::Resource;

#[derive(Debug, Deserialize)]
struct OrganizationModel {
    name: String,
    sso_domain: Option<String>,
    sso_org_id: Option<String>,
    issuer: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl From<OrganizationModel> for OrganizationRequest {
    fn from(m: OrganizationModel) -> Self {
        OrganizationRequest {
            name: m.name,
            sso_domain: m.sso_domain,
            sso_org_id: m.sso_org_id,
            issuer: m.issuer,
            client_id: m.client_id,
            client_secret: m.client_secret,
        }
    }
}

pub(crate) fn organization_state(org: &Organization) -> Value {
    json!({
        "id": org.id,
        "name": org.name,
        "sso_domain": org.sso_domain,
        "sso_org_id": org.sso_org_id,
        "issuer": org.issuer,
        "client_id": org.client_id,
    })
}

pub(crate) fn require_partner(client: &Client) -> Result<(), ProviderError> {
    if client.credential().is_partner() {
        Ok(())
    } else {
        Err(ProviderError::Configuration(
            "managing organizations requires a partner or deployment key".into(),
        ))
    }
}

/// Organization resource.
pub struct OrganizationResource;

impl OrganizationResource {
    fn state(plan_or_prior: &Value, org: &Organization) -> Value {
        let mut api = organization_state(org);
        api["client_secret"] = Value::Null;
        let mut state = populate_unknown(plan_or_prior, &api);
        preserve_sensitive(
            &mut state,
            plan_or_prior,
            &[vec!["client_secret".to_string()]],
        );
        state
    }
}

#[async_trait::async_trait]
impl Resource for OrganizationResource {
    fn type_name(&self) -> String {
        "polytomic_organization".to_string()
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("An organization, managed with a partner key")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "name",
                Attribute::required_string().with_validator(StringValidator::ValidName),
            )
            .with_attribute("sso_domain", Attribute::optional_string())
            .with_attribute("sso_org_id", Attribute::optional_string())
            .with_attribute("issuer", Attribute::optional_string())
            .with_attribute("client_id", Attribute::optional_string())
            .with_attribute("client_secret", Attribute::optional_string().sensitive())
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_organization"))]
    async fn create(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError> {
        require_partner(client)?;
        let model: OrganizationModel = from_state(plan)?;
        let org = client.create_organization(&model.into()).await?;
        info!(id = %org.id, "Organization created");
        Ok(Self::state(plan, &org))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_organization"))]
    async fn read(&self, client: &Client, state: &Value) -> Result<Value, ProviderError> {
        require_partner(client)?;
        let id = require_str(state, "id")?;
        let org = client.get_organization(id).await?;
        let mut current = organization_state(&org);
        current["client_secret"] = Value::Null;
        preserve_sensitive(&mut current, state, &[vec!["client_secret".to_string()]]);
        Ok(current)
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_organization"))]
    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        plan: &Value,
    ) -> Result<Value, ProviderError> {
        require_partner(client)?;
        let id = require_str(prior, "id")?;
        let model: OrganizationModel = from_state(plan)?;
        let org = client.update_organization(id, &model.into()).await?;
        info!(id = %org.id, "Organization updated");
        Ok(Self::state(plan, &org))
    }

    #[instrument(skip_all, fields(resource_type = "polytomic_organization"))]
    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        require_partner(client)?;
        let id = require_str(state, "id")?;
        client.delete_organization(id).await?;
        info!(id, "Organization deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_api_key_cannot_manage_organizations() {
        let client = Client::with_base_url("http://127.0.0.1:1", Credential::ApiKey("k".into()))
            .unwrap();
        let err = OrganizationResource
            .create(&client, &json!({"name": "Acme"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_read_keeps_client_secret() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/organizations/o1");
                then.status(200).json_body(json!({"data": {
                    "id": "o1",
                    "name": "Acme",
                    "client_id": "sso-client"
                }}));
            })
            .await;
        let client =
            Client::with_base_url(server.base_url(), Credential::PartnerKey("p".into())).unwrap();

        let state = OrganizationResource
            .read(&client, &json!({"id": "o1", "client_secret": "s3cret"}))
            .await
            .unwrap();
        assert_eq!(state["name"], "Acme");
        assert_eq!(state["client_id"], "sso-client");
        assert_eq!(state["client_secret"], "s3cret");
    }
}
