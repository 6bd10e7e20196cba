use serde_json::Value;
use tracing::instrument;

use crate::client::Client;
use crate::error::ProviderError;
use crate::resources::organization_state;
use crate::schema::{Attribute, Schema};
use crate::value::require_str;

use super::DataSource;

/// An organization looked up by ID.
pub struct OrganizationDataSource;

#[async_trait::async_trait]
impl DataSource for OrganizationDataSource {
    fn type_name(&self) -> String {
        "polytomic_organization".to_string()
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("An existing organization")
            .with_attribute("id", Attribute::required_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("sso_domain", Attribute::computed_string())
            .with_attribute("sso_org_id", Attribute::computed_string())
            .with_attribute("issuer", Attribute::computed_string())
            .with_attribute("client_id", Attribute::computed_string())
    }

    #[instrument(skip_all, fields(data_source_type = "polytomic_organization"))]
    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        let org = client.get_organization(require_str(config, "id")?).await?;
        Ok(organization_state(&org))
    }
}
