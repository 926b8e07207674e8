//! Upstream registry proxy client: conditional metadata fetch, streaming
//! tarball fetch, federated search, per-uplink health tracking, and explicit
//! HTTP(S) proxy support via CONNECT tunnelling.
//!
//! Config-file parsing, disk caching, response body transformation, TLS
//! termination, and search ranking are out of scope.

pub mod client;
pub mod config;
pub mod encode;
pub mod error;
pub mod health;
pub mod http;
pub mod interval;
pub mod metadata;
pub mod proxy_select;
pub mod search;
pub mod tarball;

pub use client::{HyperUplinkClient, SearchStream, UplinkClient};
pub use config::{
    AgentOptions, AuthConfig, AuthConfigRaw, AuthKind, AuthSource, MainConfig, TokenEnvRaw, UplinkConfig,
};
pub use error::UplinkError;
pub use health::HealthTracker;
pub use metadata::MetadataOptions;
pub use search::SearchOptions;
pub use tarball::{TarballOptions, TarballResponse};
