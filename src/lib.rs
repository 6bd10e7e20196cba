//! Polytomic infrastructure-as-code provider.
//!
//! This crate implements a provider plugin that manages Polytomic
//! organizations, users, connections, models, syncs, bulk syncs, and
//! permissions through the Polytomic REST API.
//!
//! # Overview
//!
//! - **Protocol**: [`proto`] holds the gRPC service compiled from
//!   `proto/provider.proto`; [`server`] wraps it behind the
//!   [`ProviderService`] trait and runs the plugin handshake.
//! - **Provider**: [`PolytomicProvider`] resolves credentials, builds the API
//!   [`client::Client`], and dispatches to the handlers in [`resources`] and
//!   [`data_sources`].
//! - **Planning**: [`plan`] computes planned states from [`schema`]s;
//!   [`state_merge`] reconciles API responses with planned and prior state so
//!   that unchanged configuration plans clean.
//! - **Testing**: [`testing::ProviderTester`] drives the provider the way the
//!   host does, without a gRPC server.
//!
//! # Handshake Protocol
//!
//! When started by the host, the plugin prints one line to stdout:
//!
//! ```text
//! 1|1|tcp|127.0.0.1:50051|grpc
//! ```
//!
//! Format: `<core version>|<protocol version>|tcp|<address>|grpc`. Resource
//! states and configs travel as JSON; values not known until apply are
//! represented by [`value::UNKNOWN_VALUE`].
//!
//! # Running
//!
//! ```ignore
//! use polytomic_provider::{init_logging, serve, PolytomicProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!     serve(PolytomicProvider::new()).await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod names;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod state_merge;
pub mod testing;
pub mod types;
pub mod validation;
pub mod value;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod proto;

// Re-export main types at crate root
pub use client::{ApiError, Client};
pub use config::{Credential, ProviderConfig};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::PolytomicProvider;
pub use schema::ProviderSchema;
pub use server::{magic_cookie_present, serve, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE, PROTOCOL_VERSION,
};
pub use validation::{validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
