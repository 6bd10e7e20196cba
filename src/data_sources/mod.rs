//! Read-only data sources.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::client::Client;
use crate::error::ProviderError;
use crate::resources::CATALOG;
use crate::schema::Schema;

mod bulk_sync_schemas;
mod connection;
mod identity;
mod organization;

/// Handlers for one data source type.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// The data source type name.
    fn type_name(&self) -> String;

    /// The data source schema.
    fn schema(&self) -> Schema;

    /// Read the data source, returning its full state.
    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError>;
}

/// All data sources keyed by type name.
pub fn registry() -> BTreeMap<String, Arc<dyn DataSource>> {
    let mut sources: Vec<Arc<dyn DataSource>> = vec![
        Arc::new(identity::IdentityDataSource),
        Arc::new(organization::OrganizationDataSource),
        Arc::new(bulk_sync_schemas::BulkSyncSchemasDataSource),
    ];
    sources.extend(CATALOG.iter().map(|kind| {
        Arc::new(connection::ConnectionDataSource::new(kind)) as Arc<dyn DataSource>
    }));
    sources.into_iter().map(|s| (s.type_name(), s)).collect()
}
