use serde_json::{json, Value};
use tracing::instrument;

use crate::client::Client;
use crate::error::ProviderError;
use crate::resources::ConnectionKind;
use crate::schema::{Attribute, Schema};
use crate::value::require_str;

use super::DataSource;

/// Looks up an existing connection by ID. Secrets are never exposed.
pub struct ConnectionDataSource {
    kind: &'static ConnectionKind,
}

impl ConnectionDataSource {
    pub fn new(kind: &'static ConnectionKind) -> Self {
        Self { kind }
    }
}

#[async_trait::async_trait]
impl DataSource for ConnectionDataSource {
    fn type_name(&self) -> String {
        self.kind.type_name()
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description(format!("An existing {} connection", self.kind.title))
            .with_attribute("id", Attribute::required_string())
            .with_attribute("organization", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("status", Attribute::computed_string())
            .with_attribute("configuration", self.kind.public_configuration_attribute())
    }

    #[instrument(skip_all, fields(data_source_type = %self.type_name()))]
    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        let id = require_str(config, "id")?;
        let conn = client.get_connection(id).await?;
        self.kind.check_type(&conn)?;
        Ok(json!({
            "id": conn.id,
            "organization": conn.organization_id,
            "name": conn.name,
            "status": conn.status,
            "configuration": self.kind.configuration_from_api(&conn.configuration, false),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use crate::resources::connection::lookup;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_read_hides_secrets() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/connections/c1");
                then.status(200).json_body(json!({"data": {
                    "id": "c1",
                    "name": "Warehouse",
                    "type": {"id": "postgresql"},
                    "status": "healthy",
                    "configuration": {
                        "hostname": "db.internal",
                        "port": 5432,
                        "password": "leaked"
                    }
                }}));
            })
            .await;
        let client =
            Client::with_base_url(server.base_url(), Credential::ApiKey("k".into())).unwrap();

        let source = ConnectionDataSource::new(lookup("postgresql").unwrap());
        let state = source.read(&client, &json!({"id": "c1"})).await.unwrap();
        assert_eq!(state["status"], "healthy");
        assert_eq!(state["configuration"]["port"], 5432);
        assert!(state["configuration"].get("password").is_none());

        let mysql = ConnectionDataSource::new(lookup("mysql").unwrap());
        assert!(mysql.read(&client, &json!({"id": "c1"})).await.is_err());
    }
}
