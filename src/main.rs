use std::process::ExitCode;
use std::time::Duration;

use polytomic_provider::{
    init_logging, magic_cookie_present, serve_with_options, PolytomicProvider, ServeOptions,
};

/// Seconds to wait for in-flight requests after a shutdown signal.
const SHUTDOWN_TIMEOUT_ENV: &str = "POLYTOMIC_PROVIDER_SHUTDOWN_TIMEOUT";

#[tokio::main]
async fn main() -> ExitCode {
    if !magic_cookie_present(|name| std::env::var(name).ok()) {
        eprintln!(
            "This binary is a plugin. These are not meant to be executed directly.\n\
             Please execute the program that consumes these plugins, which will\n\
             load any plugins automatically."
        );
        return ExitCode::FAILURE;
    }

    init_logging();

    let mut options = ServeOptions::new();
    if let Some(secs) = std::env::var(SHUTDOWN_TIMEOUT_ENV)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
    {
        options = options.with_shutdown_timeout(Duration::from_secs(secs));
    }

    match serve_with_options(PolytomicProvider::new(), options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Provider server failed");
            ExitCode::FAILURE
        },
    }
}
