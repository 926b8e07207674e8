//! The uplink client façade. Composes the interval parser, proxy selector,
//! header builder, health tracker, and the three fetch operations behind
//! one long-lived, per-uplink entity. Constructed once at server start and
//! shared via `Arc` for the life of the process.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::config::{AuthConfig, MainConfig, UplinkConfig};
use crate::error::UplinkError;
use crate::health::HealthTracker;
use crate::http::agent::{build_client, UplinkHttpClient};
use crate::http::connector::{build_tls_config, UplinkConnector};
use crate::http::headers::HeaderBuildContext;
use crate::metadata::MetadataOptions;
use crate::proxy_select::resolve_proxy;
use crate::search::SearchOptions;
use crate::tarball::{TarballOptions, TarballResponse};

/// A single search-result entry, yielded from [`UplinkClient::search`].
pub type SearchStream = Pin<Box<dyn Stream<Item = Result<Value, UplinkError>> + Send>>;

/// Object-safe façade over one configured uplink, for test doubles that
/// don't need the full hyper/rustls stack.
#[async_trait]
pub trait UplinkClient: Send + Sync {
    fn upname(&self) -> &str;

    /// Whether the circuit breaker currently considers this uplink down.
    fn is_offline(&self) -> bool;

    /// Fetches (possibly conditional) package metadata.
    async fn get_remote_metadata(
        &self,
        name: &str,
        opts: MetadataOptions<'_>,
    ) -> Result<(Value, Option<String>), UplinkError>;

    /// Fetches a tarball as a streamed byte response.
    async fn fetch_tarball(&self, url: &str, opts: TarballOptions<'_>) -> Result<TarballResponse, UplinkError>;

    /// Streams federated search results, abortable via `opts.abort`.
    async fn search(&self, opts: SearchOptions) -> Result<SearchStream, UplinkError>;
}

/// Retry orchestration for the metadata fetcher: bounded attempts with
/// exponential backoff, shaped as `{max_attempts, factor, min_timeout,
/// max_timeout}`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_timeout: Duration,
    pub max_timeout: Duration,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            min_timeout: Duration::from_millis(1000),
            max_timeout: Duration::from_secs(30),
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let scaled = self.min_timeout.as_millis() as f64 * self.factor.powi(attempt as i32);
        let capped = scaled.min(self.max_timeout.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// One configured upstream registry this proxy federates to. The
/// production implementation of [`UplinkClient`], built on `hyper` +
/// `hyper_util` + `tokio-rustls`.
///
/// Immutable after construction except for the health tracker's internal
/// counters, the only mutable fields on the client.
pub struct HyperUplinkClient {
    pub(crate) upname: String,
    pub(crate) base_url: String,
    pub(crate) hostname: String,
    pub(crate) user_agent: String,
    pub(crate) server_id: String,
    pub(crate) auth: Option<AuthConfig>,
    pub(crate) header_overrides: HashMap<String, String>,
    pub(crate) timeout: Duration,
    pub(crate) has_explicit_proxy: bool,
    pub(crate) health: HealthTracker,
    pub(crate) http_client: UplinkHttpClient,
    pub(crate) connection_semaphore: Arc<Semaphore>,
    pub(crate) retry: RetryPolicy,
}

impl HyperUplinkClient {
    /// Builds a client for one uplink. Performs no network I/O.
    ///
    /// Fails with [`UplinkError::BadInterval`] on an unparseable
    /// `timeout`/`maxage`/`fail_timeout`, [`UplinkError::InvalidUrl`] on an
    /// unparseable `url` or proxy URL, [`UplinkError::InvalidCaBundle`] on
    /// an unreadable/unparsable CA file, or an auth error when `auth` is
    /// configured but malformed. Auth is resolved once here, not deferred
    /// to first use.
    pub fn new(upname: impl Into<String>, cfg: &UplinkConfig, main: &MainConfig) -> Result<Arc<Self>, UplinkError> {
        let upname = upname.into();
        let intervals = cfg.resolve_intervals()?;

        let normalized = cfg.normalized_url();
        let parsed = url::Url::parse(normalized).map_err(|e| UplinkError::InvalidUrl(e.to_string()))?;
        let hostname = parsed
            .host_str()
            .ok_or_else(|| UplinkError::InvalidUrl(normalized.to_string()))?
            .to_string();
        let scheme = parsed.scheme().to_string();

        let auth = cfg
            .auth
            .as_ref()
            .map(AuthConfig::from_raw)
            .transpose()?;

        let proxy_url = resolve_proxy(&hostname, &scheme, cfg, main);
        let has_explicit_proxy = proxy_url.is_some();

        let tls = build_tls_config(cfg.ca.as_deref(), cfg.strict_ssl)?;
        let connector = match &proxy_url {
            Some(proxy) => UplinkConnector::via_proxy(proxy, tls)?,
            None => UplinkConnector::direct(tls),
        };
        let http_client = build_client(connector, &cfg.agent_options);

        let health = HealthTracker::new(cfg.max_fails, intervals.fail_timeout_ms, upname.clone());
        let connection_semaphore = Arc::new(Semaphore::new(cfg.agent_options.max_sockets.max(1)));

        Ok(Arc::new(Self {
            upname,
            base_url: normalized.to_string(),
            hostname,
            user_agent: main.user_agent.clone(),
            server_id: main.server_id.clone(),
            auth,
            header_overrides: cfg.headers.clone(),
            timeout: Duration::from_millis(intervals.timeout_ms),
            has_explicit_proxy,
            health,
            http_client,
            connection_semaphore,
            retry: RetryPolicy::default(),
        }))
    }

    pub fn upname(&self) -> &str {
        &self.upname
    }

    pub fn is_offline(&self) -> bool {
        self.health.is_offline()
    }

    pub(crate) fn header_context<'a>(
        &'a self,
        include_auth: bool,
        etag: Option<&'a str>,
        incoming_via: Option<&'a str>,
        remote_address: Option<&'a str>,
    ) -> HeaderBuildContext<'a> {
        HeaderBuildContext {
            user_agent: &self.user_agent,
            auth: self.auth.as_ref(),
            include_auth,
            overrides: &self.header_overrides,
            server_id: &self.server_id,
            incoming_via,
            has_explicit_proxy: self.has_explicit_proxy,
            remote_address,
            etag,
        }
    }

    pub(crate) fn join_url(&self, path_and_query: &str) -> String {
        let sep = if path_and_query.starts_with('/') { "" } else { "/" };
        format!("{}{sep}{path_and_query}", self.base_url)
    }
}

#[async_trait]
impl UplinkClient for HyperUplinkClient {
    fn upname(&self) -> &str {
        &self.upname
    }

    fn is_offline(&self) -> bool {
        self.health.is_offline()
    }

    async fn get_remote_metadata(
        &self,
        name: &str,
        opts: MetadataOptions<'_>,
    ) -> Result<(Value, Option<String>), UplinkError> {
        crate::metadata::fetch_metadata(self, name, opts).await
    }

    async fn fetch_tarball(&self, url: &str, opts: TarballOptions<'_>) -> Result<TarballResponse, UplinkError> {
        crate::tarball::fetch_tarball(self, url, opts).await
    }

    async fn search(&self, opts: SearchOptions) -> Result<SearchStream, UplinkError> {
        crate::search::search(self, opts).await
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;
