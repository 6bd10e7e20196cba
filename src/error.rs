//! Error types for the Polytomic provider.

use thiserror::Error;

use crate::client::ApiError;
use crate::schema::Diagnostic;

/// Errors that can occur while serving a provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote object was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The remote object cannot be deleted or changed because others depend on it.
    #[error("Resource in use: {message}")]
    InUse {
        /// Message returned by the API.
        message: String,
        /// Human-readable descriptions of the blocking resources.
        used_by: Vec<String>,
    },

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider is not configured, or configured incorrectly.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// The API rejected the credentials.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Any other API failure, carrying the raw error text.
    #[error("API error: {0}")]
    Api(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Operation not supported by this resource type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Malformed plan, state, or import identifier.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Whether the error means the remote object no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Render the error as an error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::InUse { message, used_by } => {
                let detail = if used_by.is_empty() {
                    message.clone()
                } else {
                    format!("{}; used by: {}", message, used_by.join(", "))
                };
                Diagnostic::error("Resource in use").with_detail(detail)
            },
            Self::NotFound(msg) => Diagnostic::error("Resource not found").with_detail(msg),
            Self::PermissionDenied(msg) => {
                Diagnostic::error("Permission denied").with_detail(msg)
            },
            Self::Configuration(msg) => {
                Diagnostic::error("Provider configuration error").with_detail(msg)
            },
            Self::Validation(msg) => Diagnostic::error("Invalid configuration").with_detail(msg),
            other => Diagnostic::error(other.to_string()),
        }
    }
}

impl From<ApiError> for ProviderError {
    fn from(err: ApiError) -> Self {
        match err.status() {
            Some(404) => ProviderError::NotFound(err.message()),
            Some(422) if err.is_in_use() => ProviderError::InUse {
                message: err.message(),
                used_by: err.used_by(),
            },
            Some(401) | Some(403) => ProviderError::PermissionDenied(err.message()),
            _ => ProviderError::Api(err.to_string()),
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::InUse { message, .. } => tonic::Status::failed_precondition(message),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::PermissionDenied(msg) => tonic::Status::permission_denied(msg),
            ProviderError::Api(msg) => tonic::Status::internal(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;
    use serde_json::json;

    fn status_error(status: u16, message: &str, metadata: Option<serde_json::Value>) -> ApiError {
        ApiError::Status {
            status,
            message: message.to_string(),
            metadata,
        }
    }

    #[test]
    fn test_api_not_found_maps_to_not_found() {
        let err: ProviderError = status_error(404, "connection not found", None).into();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Resource not found: connection not found");
    }

    #[test]
    fn test_api_in_use_names_blocking_resources() {
        let err: ProviderError = status_error(
            422,
            "connection in use",
            Some(json!({
                "used_by": [
                    {"id": "b1", "name": "Nightly copy", "type": "bulk_sync"},
                    {"id": "m1", "name": "Accounts", "type": "model"}
                ]
            })),
        )
        .into();

        let diag = err.to_diagnostic();
        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(diag.summary, "Resource in use");
        let detail = diag.detail.unwrap();
        assert!(detail.contains("bulk_sync \"Nightly copy\" (b1)"));
        assert!(detail.contains("model \"Accounts\" (m1)"));
    }

    #[test]
    fn test_api_unprocessable_without_in_use_is_generic() {
        let err: ProviderError = status_error(422, "name is required", None).into();
        assert!(matches!(err, ProviderError::Api(_)));
        assert!(err.to_string().contains("name is required"));
    }

    #[test]
    fn test_api_auth_errors_map_to_permission_denied() {
        let err: ProviderError = status_error(401, "invalid api key", None).into();
        assert!(matches!(err, ProviderError::PermissionDenied(_)));
        let err: ProviderError = status_error(403, "forbidden", None).into();
        assert!(matches!(err, ProviderError::PermissionDenied(_)));
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::NotFound("x".into()).into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = ProviderError::Configuration("x".into()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::Api("boom".into()).into();
        assert_eq!(status.code(), tonic::Code::Internal);

        let status: tonic::Status = ProviderError::InUse {
            message: "in use".into(),
            used_by: vec![],
        }
        .into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);
    }

    #[test]
    fn test_generic_diagnostic_uses_display() {
        let diag = ProviderError::Api("API error (500): boom".into()).to_diagnostic();
        assert_eq!(diag.summary, "API error: API error (500): boom");
        assert!(diag.detail.is_none());
    }
}
