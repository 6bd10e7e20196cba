//! Connections, one resource type per entry in the connection catalog.
//!
//! Every connection type shares the same handlers; only the shape of the
//! `configuration` object differs. Secrets in the configuration are
//! write-only: the API masks or omits them, so state keeps the value the user
//! configured.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use crate::client::{Client, Connection, ConnectionRequest};
use crate::error::ProviderError;
use crate::names::to_snake_case;
use crate::schema::{Attribute, AttributeFlags, AttributeType, NestingMode, Schema, StringValidator};
use crate::state_merge::{populate_unknown, populate_unknown_from_prior, preserve_sensitive};
use crate::value::{from_state, is_null_or_unknown, require_str, set_attr, unknown};

use super::Resource;

/// Value type of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    String,
    /// Whole number.
    Int64,
    /// Flag.
    Bool,
}

/// One field of a connection's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigField {
    /// Attribute name, identical to the API's key.
    pub name: &'static str,
    /// Value type.
    pub kind: FieldKind,
    /// Must be configured.
    pub required: bool,
    /// Write-only secret.
    pub sensitive: bool,
}

const fn field(name: &'static str, kind: FieldKind, required: bool, sensitive: bool) -> ConfigField {
    ConfigField {
        name,
        kind,
        required,
        sensitive,
    }
}

const fn required(name: &'static str) -> ConfigField {
    field(name, FieldKind::String, true, false)
}

const fn optional(name: &'static str) -> ConfigField {
    field(name, FieldKind::String, false, false)
}

const fn secret(name: &'static str) -> ConfigField {
    field(name, FieldKind::String, false, true)
}

const fn required_secret(name: &'static str) -> ConfigField {
    field(name, FieldKind::String, true, true)
}

const fn int(name: &'static str) -> ConfigField {
    field(name, FieldKind::Int64, false, false)
}

const fn flag(name: &'static str) -> ConfigField {
    field(name, FieldKind::Bool, false, false)
}

/// A connection type.
#[derive(Debug, PartialEq, Eq)]
pub struct ConnectionKind {
    /// Name used in the resource type, `polytomic_<name>_connection`.
    pub name: &'static str,
    /// Type identifier the API expects.
    pub api_type: &'static str,
    /// Display name.
    pub title: &'static str,
    /// Configuration fields.
    pub fields: &'static [ConfigField],
}

const SSH_FIELDS: [ConfigField; 4] = [
    flag("ssh"),
    optional("ssh_host"),
    optional("ssh_user"),
    secret("ssh_private_key"),
];

/// Every supported connection type.
pub static CATALOG: &[ConnectionKind] = &[
    ConnectionKind {
        name: "postgresql",
        api_type: "postgresql",
        title: "PostgreSQL",
        fields: &[
            required("hostname"),
            required("username"),
            secret("password"),
            required("database"),
            int("port"),
            flag("ssl"),
            flag("client_certs"),
            secret("client_certificate"),
            secret("client_key"),
            secret("ca_cert"),
            flag("change_detection"),
            optional("publication"),
            SSH_FIELDS[0],
            SSH_FIELDS[1],
            SSH_FIELDS[2],
            SSH_FIELDS[3],
            int("ssh_port"),
        ],
    },
    ConnectionKind {
        name: "mysql",
        api_type: "mysql",
        title: "MySQL",
        fields: &[
            required("hostname"),
            required("account"),
            secret("passwd"),
            required("dbname"),
            int("port"),
            flag("change_detection"),
            SSH_FIELDS[0],
            SSH_FIELDS[1],
            SSH_FIELDS[2],
            SSH_FIELDS[3],
            int("ssh_port"),
        ],
    },
    ConnectionKind {
        name: "sqlserver",
        api_type: "sqlserver",
        title: "SQL Server",
        fields: &[
            required("hostname"),
            required("username"),
            secret("password"),
            required("database"),
            int("port"),
            flag("ssl"),
        ],
    },
    ConnectionKind {
        name: "snowflake",
        api_type: "snowflake",
        title: "Snowflake",
        fields: &[
            required("account"),
            required("username"),
            secret("password"),
            required("dbname"),
            required("warehouse"),
            optional("params"),
            flag("key_pair_auth"),
            secret("private_key"),
            secret("private_key_passphrase"),
        ],
    },
    ConnectionKind {
        name: "bigquery",
        api_type: "bigquery",
        title: "BigQuery",
        fields: &[
            required("project_id"),
            required_secret("service_account"),
            optional("location"),
        ],
    },
    ConnectionKind {
        name: "redshift",
        api_type: "redshift",
        title: "Redshift",
        fields: &[
            required("hostname"),
            required("username"),
            secret("password"),
            required("database"),
            int("port"),
            optional("aws_access_key_id"),
            secret("aws_secret_access_key"),
            optional("s3_bucket_name"),
            optional("s3_bucket_region"),
        ],
    },
    ConnectionKind {
        name: "databricks",
        api_type: "databricks",
        title: "Databricks",
        fields: &[
            required("server_hostname"),
            int("port"),
            required_secret("access_token"),
            required("http_path"),
            flag("unity_catalog_enabled"),
            optional("aws_access_key_id"),
            secret("aws_secret_access_key"),
            optional("s3_bucket_name"),
            optional("s3_bucket_region"),
        ],
    },
    ConnectionKind {
        name: "s3",
        api_type: "s3",
        title: "S3",
        fields: &[
            optional("aws_access_key_id"),
            secret("aws_secret_access_key"),
            required("s3_bucket_name"),
            required("s3_bucket_region"),
            flag("is_single_table"),
            optional("single_table_name"),
        ],
    },
    ConnectionKind {
        name: "gcs",
        api_type: "gcs",
        title: "Google Cloud Storage",
        fields: &[
            required("project_id"),
            required_secret("service_account"),
            required("bucket"),
        ],
    },
    ConnectionKind {
        name: "salesforce",
        api_type: "salesforce",
        title: "Salesforce",
        fields: &[
            required("domain"),
            optional("client_id"),
            secret("client_secret"),
            flag("enforce_api_limits"),
            int("daily_api_calls"),
            int("concurrent_queries"),
        ],
    },
    ConnectionKind {
        name: "hubspot",
        api_type: "hubspot",
        title: "HubSpot",
        fields: &[required_secret("token"), optional("hub_domain")],
    },
    ConnectionKind {
        name: "api",
        api_type: "api",
        title: "HTTP API",
        fields: &[
            required("url"),
            optional("healthcheck"),
            optional("header_name"),
            secret("header_value"),
            optional("basic_username"),
            secret("basic_password"),
        ],
    },
    ConnectionKind {
        name: "webhook",
        api_type: "webhook",
        title: "Webhook",
        fields: &[required("url"), secret("secret")],
    },
    ConnectionKind {
        name: "googlesheets",
        api_type: "gsheets",
        title: "Google Sheets",
        fields: &[
            required("spreadsheet_id"),
            flag("has_headers"),
            required_secret("service_account"),
        ],
    },
];

/// Find a catalog entry by its short name.
pub fn lookup(name: &str) -> Option<&'static ConnectionKind> {
    CATALOG.iter().find(|k| k.name == name)
}

impl ConnectionKind {
    /// The resource and data source type name.
    pub fn type_name(&self) -> String {
        format!("polytomic_{}_connection", self.name)
    }

    /// The `configuration` attribute of the resource.
    pub fn configuration_attribute(&self) -> Attribute {
        let attributes: BTreeMap<String, Attribute> = self
            .fields
            .iter()
            .map(|f| {
                let flags = if f.required {
                    AttributeFlags::required()
                } else if f.sensitive {
                    AttributeFlags::optional()
                } else {
                    AttributeFlags::optional_computed()
                };
                let mut attr = Attribute::new(attribute_type(f.kind), flags);
                if f.sensitive {
                    attr = attr.sensitive();
                }
                (f.name.to_string(), attr)
            })
            .collect();
        Attribute::nested(NestingMode::Single, attributes, AttributeFlags::required())
            .with_description(format!("{} connection configuration", self.title))
    }

    /// The `configuration` attribute of the data source: computed and without secrets.
    pub fn public_configuration_attribute(&self) -> Attribute {
        let attributes: BTreeMap<String, Attribute> = self
            .fields
            .iter()
            .filter(|f| !f.sensitive)
            .map(|f| {
                (
                    f.name.to_string(),
                    Attribute::new(attribute_type(f.kind), AttributeFlags::computed()),
                )
            })
            .collect();
        Attribute::nested(NestingMode::Single, attributes, AttributeFlags::computed())
    }

    /// Project an API configuration onto the catalog fields.
    ///
    /// Keys are matched after snake_case normalisation and values are coerced
    /// to the field's type, since some connectors report ports and flags as
    /// strings.
    pub fn configuration_from_api(&self, api: &Map<String, Value>, with_secrets: bool) -> Value {
        let normalized: BTreeMap<String, &Value> =
            api.iter().map(|(k, v)| (to_snake_case(k), v)).collect();
        let out: Map<String, Value> = self
            .fields
            .iter()
            .filter(|f| with_secrets || !f.sensitive)
            .map(|f| {
                let value = normalized
                    .get(f.name)
                    .map(|v| coerce(f.kind, v))
                    .unwrap_or(Value::Null);
                (f.name.to_string(), value)
            })
            .collect();
        Value::Object(out)
    }

    /// The configured fields as an API request body.
    pub fn configuration_to_api(&self, configuration: &Value) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|f| {
                configuration
                    .get(f.name)
                    .filter(|v| !is_null_or_unknown(v))
                    .map(|v| (f.name.to_string(), v.clone()))
            })
            .collect()
    }

    /// Check that an API connection is of this kind.
    pub fn check_type(&self, conn: &Connection) -> Result<(), ProviderError> {
        match &conn.connection_type {
            Some(t) if t.id != self.api_type => Err(ProviderError::InvalidRequest(format!(
                "connection {} is of type '{}', not '{}'",
                conn.id, t.id, self.api_type
            ))),
            _ => Ok(()),
        }
    }
}

fn attribute_type(kind: FieldKind) -> AttributeType {
    match kind {
        FieldKind::String => AttributeType::String,
        FieldKind::Int64 => AttributeType::Int64,
        FieldKind::Bool => AttributeType::Bool,
    }
}

fn coerce(kind: FieldKind, value: &Value) -> Value {
    match (kind, value) {
        (FieldKind::Int64, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::Null),
        (FieldKind::Bool, Value::String(s)) => match s.trim() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Null,
        },
        (FieldKind::String, Value::Number(n)) => Value::String(n.to_string()),
        (FieldKind::String, Value::Bool(b)) => Value::String(b.to_string()),
        (_, v) => v.clone(),
    }
}

#[derive(Debug, Deserialize)]
struct ConnectionModel {
    organization: Option<String>,
    name: String,
    #[serde(default)]
    configuration: Value,
    force_destroy: Option<bool>,
}

/// A connection resource for one catalog entry.
pub struct ConnectionResource {
    kind: &'static ConnectionKind,
}

impl ConnectionResource {
    /// Handlers for the given connection type.
    pub fn new(kind: &'static ConnectionKind) -> Self {
        Self { kind }
    }

    fn request(&self, model: &ConnectionModel) -> ConnectionRequest {
        ConnectionRequest {
            name: model.name.clone(),
            connection_type: self.kind.api_type.to_string(),
            organization_id: model.organization.clone(),
            configuration: self.kind.configuration_to_api(&model.configuration),
            validate: true,
        }
    }

    fn state_from_api(&self, conn: &Connection) -> Value {
        json!({
            "id": conn.id,
            "organization": conn.organization_id,
            "name": conn.name,
            "configuration": self.kind.configuration_from_api(&conn.configuration, true),
            "force_destroy": unknown(),
        })
    }
}

#[async_trait::async_trait]
impl Resource for ConnectionResource {
    fn type_name(&self) -> String {
        self.kind.type_name()
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description(format!("A {} connection", self.kind.title))
            .with_attribute("id", Attribute::id())
            .with_attribute("organization", Attribute::organization())
            .with_attribute(
                "name",
                Attribute::required_string().with_validator(StringValidator::ValidName),
            )
            .with_attribute("configuration", self.kind.configuration_attribute())
            .with_attribute(
                "force_destroy",
                Attribute::optional_bool()
                    .with_default(json!(false))
                    .with_description("Also delete the syncs and models using this connection"),
            )
    }

    #[instrument(skip_all, fields(resource_type = %self.type_name()))]
    async fn create(&self, client: &Client, plan: &Value) -> Result<Value, ProviderError> {
        let model: ConnectionModel = from_state(plan)?;
        let conn = client.create_connection(&self.request(&model)).await?;
        info!(id = %conn.id, "Connection created");
        Ok(populate_unknown(plan, &self.state_from_api(&conn)))
    }

    #[instrument(skip_all, fields(resource_type = %self.type_name()))]
    async fn read(&self, client: &Client, state: &Value) -> Result<Value, ProviderError> {
        let id = require_str(state, "id")?;
        let conn = client.get_connection(id).await?;
        self.kind.check_type(&conn)?;

        let mut current = populate_unknown_from_prior(&self.state_from_api(&conn), state);
        preserve_sensitive(&mut current, state, &self.schema().sensitive_paths());
        if current["force_destroy"].is_null() {
            set_attr(&mut current, "force_destroy", json!(false));
        }
        Ok(current)
    }

    #[instrument(skip_all, fields(resource_type = %self.type_name()))]
    async fn update(
        &self,
        client: &Client,
        prior: &Value,
        plan: &Value,
    ) -> Result<Value, ProviderError> {
        let id = require_str(prior, "id")?;
        let model: ConnectionModel = from_state(plan)?;
        let conn = client.update_connection(id, &self.request(&model)).await?;
        info!(id = %conn.id, "Connection updated");
        Ok(populate_unknown(plan, &self.state_from_api(&conn)))
    }

    #[instrument(skip_all, fields(resource_type = %self.type_name()))]
    async fn delete(&self, client: &Client, state: &Value) -> Result<(), ProviderError> {
        let id = require_str(state, "id")?;
        let force = state
            .get("force_destroy")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        client.delete_connection(id, force).await?;
        info!(id, force, "Connection deleted");
        Ok(())
    }
}
