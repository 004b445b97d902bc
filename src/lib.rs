//! Hemmer provider for Whisparr
//!
//! Manages the configuration of a [Whisparr](https://whisparr.com) instance
//! through its v3 REST API: tags, root folders, delay profiles, remote path
//! mappings, quality profiles, indexers, download clients, notifications and
//! import lists. Every resource also has a lookup data source
//! (`whisparr_tag`) and a listing data source (`whisparr_tags`);
//! `whisparr_system_status` reports on the instance itself.
//!
//! # Provider configuration
//!
//! | Attribute | Fallback | |
//! |---|---|---|
//! | `url` | `WHISPARR_URL` | base URL, e.g. `http://localhost:6969` |
//! | `api_key` | `WHISPARR_API_KEY` | sent as `X-Api-Key`, sensitive |
//! | `extra_headers` | | map of headers added to every request |
//!
//! # Layout
//!
//! - [`client`]: reqwest client and the serde models of the API
//! - [`fields`]: packing of implementation settings into Whisparr `Field`s
//! - [`resources`]: one module per entity, mapping state to API models
//! - [`data_sources`]: lookups, listings and system status
//! - [`plan`]: schema-driven diffing shared by every resource
//! - [`provider`]: [`WhisparrProvider`], dispatching host calls by type name
//! - [`server`]: the gRPC host protocol and the `HEMMER_PROVIDER` handshake
//!
//! # Handshake
//!
//! On start the binary binds an ephemeral localhost port and prints
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! to stdout. Logs go to stderr.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod fields;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use client::WhisparrClient;
pub use config::{ProviderConfig, ResolvedConfig};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::WhisparrProvider;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
