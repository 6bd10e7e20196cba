use serde_json::{json, Value};
use tracing::instrument;

use crate::client::Client;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

use super::DataSource;

/// The caller behind the configured credential.
pub struct IdentityDataSource;

#[async_trait::async_trait]
impl DataSource for IdentityDataSource {
    fn type_name(&self) -> String {
        "polytomic_identity".to_string()
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("The identity of the configured credential")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("email", Attribute::computed_string())
            .with_attribute("organization_id", Attribute::computed_string())
            .with_attribute("organization_name", Attribute::computed_string())
            .with_attribute("role", Attribute::computed_string())
            .with_attribute("is_partner", Attribute::computed_bool())
            .with_attribute("is_user", Attribute::computed_bool())
    }

    #[instrument(skip_all, fields(data_source_type = "polytomic_identity"))]
    async fn read(&self, client: &Client, _config: &Value) -> Result<Value, ProviderError> {
        let me = client.identity().await?;
        Ok(json!({
            "id": me.id.or_else(|| me.organization_id.clone()),
            "email": me.email,
            "organization_id": me.organization_id,
            "organization_name": me.organization_name,
            "role": me.role,
            "is_partner": me.is_partner,
            "is_user": me.is_user,
        }))
    }
}
