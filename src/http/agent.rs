//! The long-lived `hyper_util` client bound to one uplink's connector,
//! parameterised over [`UplinkConnector`] so a proxy-bound agent and a
//! direct agent share one client type. An explicit proxy URL replaces the
//! direct agent entirely rather than layering on top of it.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::{Request, Response};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::config::AgentOptions;
use crate::error::UplinkError;
use crate::http::connector::{apply_agent_options, UplinkConnector};

/// Request/response body type used throughout the crate: empty for GETs,
/// `Full` for the rare request with a body, never decoded or transformed
/// (spec non-goal: response body transformation).
pub type ReqBody = BoxBody<Bytes, std::convert::Infallible>;

pub type UplinkHttpClient = Client<UplinkConnector, ReqBody>;

pub fn empty_body() -> ReqBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

#[allow(dead_code)]
pub fn full_body(bytes: Bytes) -> ReqBody {
    Full::new(bytes).map_err(|never| match never {}).boxed()
}

/// Builds the per-uplink client, tuned per `agent_options`.
pub fn build_client(connector: UplinkConnector, opts: &AgentOptions) -> UplinkHttpClient {
    let builder = Client::builder(TokioExecutor::new());
    let builder = apply_agent_options(builder, opts);
    builder.build(connector)
}

/// Issues `req` against `client`, enforcing `timeout` and mapping transport
/// failures (connect/TLS/timeout/abort) into [`UplinkError::Transport`]
/// unchanged.
pub async fn send(
    client: &UplinkHttpClient,
    req: Request<ReqBody>,
    timeout: Duration,
) -> Result<Response<hyper::body::Incoming>, UplinkError> {
    match tokio::time::timeout(timeout, client.request(req)).await {
        Ok(Ok(resp)) => Ok(resp),
        Ok(Err(e)) => Err(UplinkError::Transport(anyhow::anyhow!("request failed: {e}"))),
        Err(_) => Err(UplinkError::Transport(anyhow::anyhow!(
            "request timed out after {timeout:?}"
        ))),
    }
}
