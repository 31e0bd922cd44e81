//! Hemmer provider for Fivetran.
//!
//! Manages Fivetran groups, users, destinations, connections, connection
//! schedules, schema / table / column settings, webhooks and user
//! memberships from a Hemmer configuration.
//!
//! The plugin runs as a child process of the Hemmer engine. On start it
//! binds a local port, prints the handshake line
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! on stdout and serves the `hemmer.provider.v1.Provider` gRPC service.
//! Logs go to stderr.
//!
//! # Layout
//!
//! - [`server`]: the gRPC binding and the [`ProviderService`] seam
//! - [`provider`]: [`FivetranProvider`], dispatching to the handlers
//! - [`resources`] / [`data_sources`]: one handler per Fivetran object type
//! - [`client`]: typed Fivetran REST client
//! - [`core`]: schema locks, conflict retries, compensation and set
//!   reconciliation shared by the handlers
//! - [`plan`] / [`validation`]: schema-driven planning and validation

#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod core;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

/// Protocol messages generated from `proto/provider.proto`.
#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated {
    tonic::include_proto!("hemmer.provider.v1");
}

pub use client::{FivetranClient, FivetranError};
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, try_init_logging};
pub use provider::FivetranProvider;
pub use schema::ProviderSchema;
pub use server::{serve, serve_on, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
