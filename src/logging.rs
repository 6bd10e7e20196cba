//! Logging setup for the provider binary.
//!
//! All logs go to **stderr**; stdout carries the plugin handshake and must not
//! be written to.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: full `tracing` filter directives (e.g. `polytomic_provider=debug`)
//! - `TF_LOG`: the host's log level (`TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`),
//!   used when `RUST_LOG` is unset
//!
//! Without either, the level defaults to `info`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Map a `TF_LOG` value to a `tracing` level directive.
///
/// `JSON` is the host's structured-output mode and maps to `trace`.
pub fn tf_log_directive(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "JSON" => Some("trace"),
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARN" => Some("warn"),
        "ERROR" => Some("error"),
        _ => None,
    }
}

fn build_filter(default_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = std::env::var("TF_LOG")
        .ok()
        .and_then(|v| tf_log_directive(&v))
        .unwrap_or(default_level);
    EnvFilter::new(level)
}

/// Initialize the global subscriber, defaulting to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize the global subscriber with a custom default level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(build_filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Try to initialize logging, returning false if a subscriber is already set.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(build_filter("info"))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tf_log_levels() {
        assert_eq!(tf_log_directive("TRACE"), Some("trace"));
        assert_eq!(tf_log_directive("debug"), Some("debug"));
        assert_eq!(tf_log_directive(" Warn "), Some("warn"));
        assert_eq!(tf_log_directive("JSON"), Some("trace"));
        assert_eq!(tf_log_directive("OFF"), None);
    }

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("polytomic_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,polytomic_provider::client=trace").is_ok());
    }
}
