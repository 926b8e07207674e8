//! In-memory configuration shapes consumed by the uplink client.
//!
//! Parsing these out of a config *file* (YAML/TOML/JSON on disk) is an
//! external-collaborator concern; this module only defines and
//! validates the shape once it has already been deserialized by the caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::interval::parse_timeout_ms;
use crate::error::UplinkError;

/// Raw `token_env` shape as it arrives from config deserialization: either
/// an env var name, or the `true`/`false` default-lookup toggle. `String`
/// and `bool` never overlap on the wire, so untagged deserialization is
/// unambiguous here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TokenEnvRaw {
    Name(String),
    UseDefault(bool),
}

/// How the bearer/basic token for an uplink should be resolved, parsed
/// once at construction from the wire-level polymorphic `{type, token?,
/// token_env?}` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSource {
    /// Token given literally in config.
    Literal(String),
    /// Name of an environment variable to read the token from.
    EnvVar(String),
    /// `token_env: true`, read from the conventional `NPM_TOKEN` variable.
    DefaultEnv(bool),
}

/// Supported `Authorization` header schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Basic,
    Bearer,
}

impl AuthKind {
    fn parse(raw: &str) -> Result<Self, UplinkError> {
        match raw.to_ascii_lowercase().as_str() {
            "basic" => Ok(AuthKind::Basic),
            "bearer" => Ok(AuthKind::Bearer),
            other => Err(UplinkError::AuthInvalid(other.to_string())),
        }
    }

    /// Renders the capitalised scheme name used in the `Authorization` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthKind::Basic => "Basic",
            AuthKind::Bearer => "Bearer",
        }
    }
}

/// Raw `auth` shape as it arrives from config deserialization.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfigRaw {
    #[serde(rename = "type")]
    pub kind: String,
    pub token: Option<String>,
    #[serde(rename = "token_env")]
    pub token_env: Option<TokenEnvRaw>,
}

/// Parsed, validated auth configuration, resolved once at construction.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub kind: AuthKind,
    pub source: AuthSource,
}

impl AuthConfig {
    pub fn from_raw(raw: &AuthConfigRaw) -> Result<Self, UplinkError> {
        let kind = AuthKind::parse(&raw.kind)?;
        let source = if let Some(token) = &raw.token {
            AuthSource::Literal(token.clone())
        } else {
            match &raw.token_env {
                Some(TokenEnvRaw::Name(name)) => AuthSource::EnvVar(name.clone()),
                Some(TokenEnvRaw::UseDefault(use_default)) => AuthSource::DefaultEnv(*use_default),
                None => AuthSource::DefaultEnv(true),
            }
        };
        Ok(Self { kind, source })
    }

    /// Resolves the actual token value, reading the environment if required.
    pub fn resolve_token(&self) -> Result<String, UplinkError> {
        match &self.source {
            AuthSource::Literal(token) => Ok(token.clone()),
            AuthSource::EnvVar(name) => {
                std::env::var(name).map_err(|_| UplinkError::TokenRequired)
            }
            AuthSource::DefaultEnv(true) => {
                std::env::var("NPM_TOKEN").map_err(|_| UplinkError::TokenRequired)
            }
            AuthSource::DefaultEnv(false) => Err(UplinkError::TokenRequired),
        }
    }
}

/// Keep-alive tuning passed through to the HTTP agent (defaults:
/// `maxSockets=40`, `maxFreeSockets=10`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentOptions {
    #[serde(rename = "keepAlive", default = "default_keep_alive")]
    pub keep_alive: bool,
    #[serde(rename = "maxSockets", default = "default_max_sockets")]
    pub max_sockets: usize,
    #[serde(rename = "maxFreeSockets", default = "default_max_free_sockets")]
    pub max_free_sockets: usize,
}

fn default_keep_alive() -> bool {
    true
}
fn default_max_sockets() -> usize {
    40
}
fn default_max_free_sockets() -> usize {
    10
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            keep_alive: default_keep_alive(),
            max_sockets: default_max_sockets(),
            max_free_sockets: default_max_free_sockets(),
        }
    }
}

/// Raw per-uplink configuration, as deserialized from the enclosing
/// registry server's config.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UplinkConfig {
    pub url: String,
    pub ca: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: String,
    #[serde(default = "default_maxage")]
    pub maxage: String,
    #[serde(default = "default_max_fails")]
    pub max_fails: u32,
    #[serde(default = "default_fail_timeout")]
    pub fail_timeout: String,
    #[serde(default = "default_strict_ssl")]
    pub strict_ssl: bool,
    pub auth: Option<AuthConfigRaw>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub no_proxy: Option<String>,
    #[serde(default)]
    pub agent_options: AgentOptions,
}

fn default_timeout() -> String {
    "30s".to_string()
}
fn default_maxage() -> String {
    "2m".to_string()
}
fn default_max_fails() -> u32 {
    2
}
fn default_fail_timeout() -> String {
    "30s".to_string()
}
fn default_strict_ssl() -> bool {
    true
}

impl UplinkConfig {
    /// Base URL with any trailing slash stripped.
    pub fn normalized_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

/// Server-wide configuration the uplink client falls back to when an uplink
/// does not override a given field.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MainConfig {
    pub user_agent: String,
    pub server_id: String,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub no_proxy: Option<String>,
}

/// Resolves `timeout`/`maxage`/`fail_timeout` to millisecond `Duration`s,
/// shared by client construction.
pub struct ResolvedIntervals {
    pub timeout_ms: u64,
    pub maxage_ms: u64,
    pub fail_timeout_ms: u64,
}

impl UplinkConfig {
    pub fn resolve_intervals(&self) -> Result<ResolvedIntervals, UplinkError> {
        Ok(ResolvedIntervals {
            timeout_ms: parse_timeout_ms(&self.timeout, "timeout")?,
            maxage_ms: parse_timeout_ms(&self.maxage, "maxage")?,
            fail_timeout_ms: parse_timeout_ms(&self.fail_timeout, "fail_timeout")?,
        })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
