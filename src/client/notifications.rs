use serde::{Deserialize, Serialize};

use super::{ApiError, Client};

/// Addresses notified of any sync error in the organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalErrorSubscribers {
    /// Email addresses, in the order the API keeps them.
    #[serde(default)]
    pub emails: Vec<String>,
}

const PATH: &str = "/api/notifications/global-error-subscribers";

impl Client {
    /// Current subscribers.
    pub async fn get_global_error_subscribers(&self) -> Result<GlobalErrorSubscribers, ApiError> {
        self.get(PATH).await
    }

    /// Replace the subscriber list.
    pub async fn set_global_error_subscribers(
        &self,
        subscribers: &GlobalErrorSubscribers,
    ) -> Result<GlobalErrorSubscribers, ApiError> {
        self.put(PATH, subscribers).await
    }
}
