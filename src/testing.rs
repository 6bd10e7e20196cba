//! Testing utilities for exercising the provider without a gRPC server.
//!
//! [`ProviderTester`] drives a [`ProviderService`] the way the host does:
//! validate, plan, apply, and refresh. Pair it with an HTTP mock of the
//! Polytomic API and [`ProviderTester::configure_for`].
//!
//! # Example
//!
//! ```ignore
//! use polytomic_provider::testing::ProviderTester;
//! use polytomic_provider::PolytomicProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_role() {
//!     let server = httpmock::MockServer::start_async().await;
//!     // ... register mocks ...
//!     let tester = ProviderTester::new(PolytomicProvider::with_env(|_| None));
//!     tester.configure_for(&server.base_url()).await.unwrap();
//!
//!     let state = tester
//!         .lifecycle_create("polytomic_role", json!({"name": "Analyst"}))
//!         .await
//!         .unwrap();
//!     assert_eq!(state["name"], "Analyst");
//! }
//! ```

use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::value::contains_unknown;

/// A test harness wrapping a [`ProviderService`].
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Get the list of data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration. Error diagnostics become `Err`.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider. Error diagnostics become `Err`.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider against a mock deployment with an API key.
    pub async fn configure_for(&self, base_url: &str) -> Result<(), TestError> {
        self.configure(json!({"api_key": "test-key", "deployment_url": base_url}))
            .await
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, config.clone(), config)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), config.clone(), config)
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource. Null means it is gone.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Read data from a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Plan and create, then refresh. Returns the state after the refresh.
    ///
    /// Fails if the applied state still holds unknown values.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        ensure_known(resource_type, &created)?;
        self.read(resource_type, created).await
    }

    /// Plan and update, then refresh. Returns the state after the refresh.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), config)
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        ensure_known(resource_type, &updated)?;
        self.read(resource_type, updated).await
    }

    /// Plan a destroy, then delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }

    /// Assert that re-planning an unchanged configuration against `state`
    /// produces no changes.
    pub async fn assert_no_drift(
        &self,
        resource_type: &str,
        state: Value,
        config: Value,
    ) -> Result<(), TestError> {
        let plan = self.plan_update(resource_type, state, config).await?;
        if plan.has_changes() {
            return Err(TestError::Drift(
                plan.changes.into_iter().map(|c| c.path).collect(),
            ));
        }
        Ok(())
    }
}

fn ensure_known(resource_type: &str, state: &Value) -> Result<(), ProviderError> {
    if contains_unknown(state) {
        return Err(ProviderError::InvalidRequest(format!(
            "{} returned a state with unknown values",
            resource_type
        )));
    }
    Ok(())
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// The operation failed with error diagnostics.
    #[error("operation failed with diagnostics: {}", summaries(.0))]
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    /// A re-plan of unchanged configuration wanted to change these attributes.
    #[error("plan not empty, changed attributes: {}", .0.join(", "))]
    Drift(Vec<String>),
}

fn summaries(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| match &d.attribute {
            Some(attr) => format!("{} (at {})", d.summary, attr),
            None => d.summary.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check diagnostics and return an error if there are any errors.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| d.severity == DiagnosticSeverity::Error)
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that a diagnostic list has an error whose summary contains `text`.
pub fn assert_has_error(diagnostics: &[Diagnostic], text: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error && d.summary.contains(text)),
        "expected an error containing {:?}, got {:?}",
        text,
        diagnostics
    );
}

/// Assert that a diagnostic list has no errors.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == DiagnosticSeverity::Error)
        .collect();
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PolytomicProvider;
    use httpmock::prelude::*;

    fn tester() -> ProviderTester<PolytomicProvider> {
        ProviderTester::new(PolytomicProvider::with_env(|_| None))
    }

    #[test]
    fn test_check_diagnostics() {
        assert!(check_diagnostics(vec![Diagnostic::warning("careful")]).is_ok());
        let err = check_diagnostics(vec![
            Diagnostic::warning("careful"),
            Diagnostic::error("broken").with_attribute("name"),
        ])
        .unwrap_err();
        match &err {
            TestError::Diagnostics(d) => assert_eq!(d.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
        assert!(err.to_string().contains("broken (at name)"));
    }

    #[test]
    fn test_assert_helpers() {
        let diagnostics = vec![Diagnostic::error("Missing Polytomic credentials")];
        assert_has_error(&diagnostics, "credentials");
        assert_no_errors(&[Diagnostic::warning("fine")]);
    }

    #[test]
    fn test_registered_types() {
        let tester = tester();
        let resources = tester.resource_types();
        assert!(resources.contains(&"polytomic_postgresql_connection".to_string()));
        assert!(resources.contains(&"polytomic_bulk_sync".to_string()));
        assert!(tester
            .data_source_types()
            .contains(&"polytomic_identity".to_string()));
    }

    #[tokio::test]
    async fn test_validate_provider_config_conflicting_credentials() {
        let err = tester()
            .validate_provider_config(json!({"api_key": "a", "deployment_api_key": "b"}))
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::Diagnostics(_)));
    }

    #[tokio::test]
    async fn test_role_lifecycle_and_drift() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/permissions/roles")
                    .json_body_partial(r#"{"name": "Analyst"}"#);
                then.status(200)
                    .json_body(json!({"data": {"id": "r1", "name": "Analyst", "organization_id": "o1"}}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/permissions/roles/r1");
                then.status(200)
                    .json_body(json!({"data": {"id": "r1", "name": "Analyst", "organization_id": "o1"}}));
            })
            .await;

        let tester = tester();
        tester.configure_for(&server.base_url()).await.unwrap();
        let config = json!({"name": "Analyst", "organization": null, "id": null});
        let state = tester
            .lifecycle_create("polytomic_role", config.clone())
            .await
            .unwrap();
        assert_eq!(state["id"], "r1");
        assert_eq!(state["organization"], "o1");

        tester
            .assert_no_drift("polytomic_role", state, config)
            .await
            .unwrap();
    }
}
