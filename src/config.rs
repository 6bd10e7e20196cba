//! Provider block configuration.
//!
//! Every attribute may be left out of the provider block and supplied through
//! the environment instead. Exactly one credential must resolve.

use serde::Deserialize;
use serde_json::Value;

use crate::schema::{Attribute, Diagnostic, Schema};
use crate::value::from_state;

/// Default Polytomic deployment.
pub const DEFAULT_DEPLOYMENT_URL: &str = "app.polytomic.com";

/// Environment variable for `api_key`.
pub const ENV_API_KEY: &str = "POLYTOMIC_API_KEY";
/// Environment variable for `partner_key`.
pub const ENV_PARTNER_KEY: &str = "POLYTOMIC_PARTNER_KEY";
/// Environment variable for `deployment_api_key`.
pub const ENV_DEPLOYMENT_KEY: &str = "POLYTOMIC_DEPLOYMENT_KEY";
/// Environment variable for `deployment_url`.
pub const ENV_DEPLOYMENT_URL: &str = "POLYTOMIC_DEPLOYMENT_URL";

/// The provider block as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// Organization-scoped API key.
    pub api_key: Option<String>,
    /// Partner key, for managing organizations.
    pub partner_key: Option<String>,
    /// Deployment-wide key for on-premises installs.
    pub deployment_api_key: Option<String>,
    /// Deployment host or URL.
    pub deployment_url: Option<String>,
}

/// The credential used to authenticate API calls.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Organization API key, sent as a bearer token.
    ApiKey(String),
    /// Partner key, sent as a bearer token.
    PartnerKey(String),
    /// Deployment key, sent as basic auth.
    DeploymentKey(String),
}

impl Credential {
    /// Whether the credential can manage organizations.
    pub fn is_partner(&self) -> bool {
        matches!(self, Self::PartnerKey(_) | Self::DeploymentKey(_))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::ApiKey(_) => "ApiKey",
            Self::PartnerKey(_) => "PartnerKey",
            Self::DeploymentKey(_) => "DeploymentKey",
        };
        write!(f, "{}([REDACTED])", kind)
    }
}

/// Configuration after applying environment fallbacks and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Base URL including scheme, without trailing slash.
    pub base_url: String,
    /// The single configured credential.
    pub credential: Credential,
}

impl ProviderConfig {
    /// Parse the provider block.
    pub fn from_value(value: &Value) -> Result<Self, Diagnostic> {
        if value.is_null() {
            return Ok(Self::default());
        }
        from_state(value).map_err(|e| {
            Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())
        })
    }

    /// Apply environment fallbacks and validate the credentials.
    pub fn resolve<F>(&self, env: F) -> Result<ResolvedConfig, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |configured: &Option<String>, var: &str| {
            configured
                .clone()
                .filter(|s| !s.is_empty())
                .or_else(|| env(var).filter(|s| !s.is_empty()))
        };

        let mut credentials = Vec::new();
        if let Some(key) = pick(&self.api_key, ENV_API_KEY) {
            credentials.push(("api_key", Credential::ApiKey(key)));
        }
        if let Some(key) = pick(&self.partner_key, ENV_PARTNER_KEY) {
            credentials.push(("partner_key", Credential::PartnerKey(key)));
        }
        if let Some(key) = pick(&self.deployment_api_key, ENV_DEPLOYMENT_KEY) {
            credentials.push(("deployment_api_key", Credential::DeploymentKey(key)));
        }

        let credential = match credentials.len() {
            0 => {
                return Err(vec![Diagnostic::error("Missing Polytomic credentials")
                    .with_detail(format!(
                        "Set one of api_key, partner_key or deployment_api_key, or the {}, {} or {} environment variables",
                        ENV_API_KEY, ENV_PARTNER_KEY, ENV_DEPLOYMENT_KEY
                    ))]);
            },
            1 => credentials.remove(0).1,
            _ => {
                let names: Vec<&str> = credentials.iter().map(|(name, _)| *name).collect();
                return Err(vec![Diagnostic::error("Conflicting Polytomic credentials")
                    .with_detail(format!(
                        "Only one credential may be set, found: {}",
                        names.join(", ")
                    ))]);
            },
        };

        let url = pick(&self.deployment_url, ENV_DEPLOYMENT_URL)
            .unwrap_or_else(|| DEFAULT_DEPLOYMENT_URL.to_string());

        Ok(ResolvedConfig {
            base_url: normalize_url(&url),
            credential,
        })
    }
}

/// Add `https://` when the URL has no scheme and strip trailing slashes.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Schema of the provider block.
pub fn provider_schema() -> Schema {
    Schema::v0()
        .with_description("Manage Polytomic connections, syncs, models and permissions")
        .with_attribute(
            "api_key",
            Attribute::optional_string()
                .sensitive()
                .with_description(format!("Organization API key. May also be set with {}", ENV_API_KEY)),
        )
        .with_attribute(
            "partner_key",
            Attribute::optional_string()
                .sensitive()
                .with_description(format!("Partner key. May also be set with {}", ENV_PARTNER_KEY)),
        )
        .with_attribute(
            "deployment_api_key",
            Attribute::optional_string().sensitive().with_description(format!(
                "Deployment API key. May also be set with {}",
                ENV_DEPLOYMENT_KEY
            )),
        )
        .with_attribute(
            "deployment_url",
            Attribute::optional_string().with_description(format!(
                "Polytomic deployment URL, defaults to {}. May also be set with {}",
                DEFAULT_DEPLOYMENT_URL, ENV_DEPLOYMENT_URL
            )),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_resolve_from_block() {
        let config = ProviderConfig::from_value(&json!({"api_key": "k1"})).unwrap();
        let resolved = config.resolve(env(&[])).unwrap();
        assert_eq!(resolved.credential, Credential::ApiKey("k1".into()));
        assert_eq!(resolved.base_url, "https://app.polytomic.com");
    }

    #[test]
    fn test_resolve_from_env() {
        let config = ProviderConfig::from_value(&Value::Null).unwrap();
        let resolved = config
            .resolve(env(&[
                (ENV_PARTNER_KEY, "p1"),
                (ENV_DEPLOYMENT_URL, "polytomic.internal.example.com/"),
            ]))
            .unwrap();
        assert_eq!(resolved.credential, Credential::PartnerKey("p1".into()));
        assert!(resolved.credential.is_partner());
        assert_eq!(resolved.base_url, "https://polytomic.internal.example.com");
    }

    #[test]
    fn test_block_wins_over_env_for_same_credential() {
        let config = ProviderConfig::from_value(&json!({"api_key": "block"})).unwrap();
        let resolved = config.resolve(env(&[(ENV_API_KEY, "env")])).unwrap();
        assert_eq!(resolved.credential, Credential::ApiKey("block".into()));
    }

    #[test]
    fn test_missing_credentials() {
        let err = ProviderConfig::default().resolve(env(&[])).unwrap_err();
        assert_eq!(err[0].summary, "Missing Polytomic credentials");
    }

    #[test]
    fn test_conflicting_credentials() {
        let config = ProviderConfig::from_value(&json!({"api_key": "k"})).unwrap();
        let err = config
            .resolve(env(&[(ENV_DEPLOYMENT_KEY, "d")]))
            .unwrap_err();
        assert_eq!(err[0].summary, "Conflicting Polytomic credentials");
        assert!(err[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("api_key, deployment_api_key"));
    }

    #[test]
    fn test_normalize_url_keeps_scheme() {
        assert_eq!(normalize_url("http://localhost:8080/"), "http://localhost:8080");
        assert_eq!(normalize_url("app.polytomic.com"), "https://app.polytomic.com");
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let debug = format!("{:?}", Credential::ApiKey("secret-key".into()));
        assert_eq!(debug, "ApiKey([REDACTED])");
    }

    #[test]
    fn test_invalid_block_type() {
        let err = ProviderConfig::from_value(&json!({"api_key": 3})).unwrap_err();
        assert_eq!(err.summary, "Invalid provider configuration");
    }
}
