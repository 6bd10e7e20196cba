//! The Polytomic provider: configuration and dispatch to resource handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::config::{provider_schema, ProviderConfig};
use crate::data_sources::{self, DataSource};
use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::resources::{self, Resource};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities};
use crate::validation::validate;
use crate::value::contains_unknown;

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// The Polytomic provider.
///
/// Resource handlers are looked up by type name. The API client is created
/// by [`ProviderService::configure`]; every CRUD call before that fails with
/// a configuration error.
pub struct PolytomicProvider {
    resources: BTreeMap<String, Arc<dyn Resource>>,
    data_sources: BTreeMap<String, Arc<dyn DataSource>>,
    client: RwLock<Option<Arc<Client>>>,
    env: EnvLookup,
}

impl Default for PolytomicProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PolytomicProvider {
    /// A provider reading credential fallbacks from the process environment.
    pub fn new() -> Self {
        Self::with_env(|name| std::env::var(name).ok())
    }

    /// A provider with a custom environment lookup.
    pub fn with_env<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            resources: resources::registry(),
            data_sources: data_sources::registry(),
            client: RwLock::new(None),
            env: Arc::new(env),
        }
    }

    fn resource(&self, resource_type: &str) -> Result<&Arc<dyn Resource>, ProviderError> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&Arc<dyn DataSource>, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }

    async fn client(&self) -> Result<Arc<Client>, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("the provider has not been configured".into())
        })
    }
}

/// Fill attributes the schema declares but the handler left out with null.
fn complete_state(schema: &crate::schema::Schema, mut state: Value) -> Value {
    if let Value::Object(map) = &mut state {
        for name in schema.attributes.keys() {
            map.entry(name.clone()).or_insert(Value::Null);
        }
    }
    state
}

#[async_trait::async_trait]
impl ProviderService for PolytomicProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(provider_schema());
        for (name, resource) in &self.resources {
            schema = schema.with_resource(name.clone(), resource.schema());
        }
        for (name, source) in &self.data_sources {
            schema = schema.with_data_source(name.clone(), source.schema());
        }
        schema
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: self.resources.keys().cloned().collect(),
            data_sources: self.data_sources.keys().cloned().collect(),
            capabilities: ServerCapabilities { plan_destroy: true },
        }
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validate(&provider_schema(), &config);
        if !diagnostics.is_empty() || contains_unknown(&config) {
            return Ok(diagnostics);
        }
        match ProviderConfig::from_value(&config) {
            Ok(parsed) => {
                if let Err(errors) = parsed.resolve(|name| (self.env)(name)) {
                    diagnostics.extend(errors);
                }
            },
            Err(diagnostic) => diagnostics.push(diagnostic),
        }
        Ok(diagnostics)
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let parsed = match ProviderConfig::from_value(&config) {
            Ok(parsed) => parsed,
            Err(diagnostic) => return Ok(vec![diagnostic]),
        };
        let resolved = match parsed.resolve(|name| (self.env)(name)) {
            Ok(resolved) => resolved,
            Err(diagnostics) => return Ok(diagnostics),
        };
        let client = Client::new(&resolved)
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        info!(
            base_url = %resolved.base_url,
            credential = ?resolved.credential,
            "Provider configured"
        );
        *self.client.write().await = Some(Arc::new(client));
        Ok(vec![])
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.client.write().await.take();
        debug!("Provider stopped");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut diagnostics = validate(&resource.schema(), &config);
        diagnostics.extend(resource.validate(&config));
        Ok(diagnostics)
    }

    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let schema = self.resource(resource_type)?.schema();
        if version > schema.version as i64 {
            return Err(ProviderError::InvalidRequest(format!(
                "state version {} of {} is newer than this provider supports ({})",
                version, resource_type, schema.version
            )));
        }
        Ok(complete_state(&schema, state))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut plan = plan_resource(&resource.schema(), prior_state.as_ref(), &proposed_state);
        if !proposed_state.is_null() {
            resource.modify_plan(&mut plan, prior_state.as_ref());
        }
        Ok(plan)
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let state = resource.create(&client, &planned_state).await?;
        Ok(complete_state(&resource.schema(), state))
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        match resource.read(&client, &current_state).await {
            Ok(state) => Ok(complete_state(&resource.schema(), state)),
            Err(e) if e.is_not_found() => {
                warn!(resource_type, error = %e, "Resource no longer exists, removing from state");
                Ok(Value::Null)
            },
            Err(e) => Err(e),
        }
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let state = resource
            .update(&client, &prior_state, &planned_state)
            .await?;
        Ok(complete_state(&resource.schema(), state))
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        match resource.delete(&client, &current_state).await {
            Err(e) if e.is_not_found() => {
                debug!(resource_type, "Resource already deleted");
                Ok(())
            },
            other => other,
        }
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let state = resource.import(&client, id).await?;
        info!(resource_type, id, "Resource imported");
        Ok(vec![ImportedResource::new(
            resource_type,
            complete_state(&resource.schema(), state),
        )])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let source = self.data_source(data_source_type)?;
        Ok(validate(&source.schema(), &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let source = self.data_source(data_source_type)?;
        let client = self.client().await?;
        let state = source.read(&client, &config).await?;
        Ok(complete_state(&source.schema(), state))
    }
}
