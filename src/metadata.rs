//! Conditional package metadata fetch.
//!
//! Exercised end-to-end against a mock upstream in `tests/`, not here:
//! every path through this module does real I/O, which only a harness
//! spinning up a throwaway server can cover meaningfully.

use hyper::header::ETAG;
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use serde_json::Value;

use crate::client::HyperUplinkClient;
use crate::encode::encode_package_name;
use crate::error::UplinkError;
use crate::http::agent::{empty_body, send, ReqBody};

/// Per-call options for [`crate::client::UplinkClient::get_remote_metadata`].
pub struct MetadataOptions<'a> {
    /// `ETag` of the caller's cached copy, sent as `If-None-Match`.
    pub etag: Option<&'a str>,
    /// Incoming `Via` header value, to chain this hop onto.
    pub incoming_via: Option<&'a str>,
    /// Client address to forward as `X-Forwarded-For` (suppressed when this
    /// uplink traverses an explicit proxy).
    pub remote_address: Option<&'a str>,
}

fn build_get_request(url: &str, headers: &HeaderMap) -> Result<Request<ReqBody>, UplinkError> {
    let mut builder = Request::builder().method(Method::GET).uri(url);
    for (name, value) in headers.iter() {
        builder = builder.header(name, value);
    }
    builder
        .body(empty_body())
        .map_err(|e| UplinkError::InvalidUrl(e.to_string()))
}

async fn classify_response(
    client: &HyperUplinkClient,
    resp: Response<hyper::body::Incoming>,
) -> Result<(Value, Option<String>), UplinkError> {
    let status = resp.status();

    if status == StatusCode::NOT_MODIFIED {
        client.health.record_success();
        return Err(UplinkError::NotModifiedNoData);
    }
    if status == StatusCode::NOT_FOUND {
        client.health.record_success();
        return Err(UplinkError::NotFoundUplink);
    }
    if !status.is_success() {
        client.health.record_failure();
        return Err(UplinkError::BadStatusCode { status: status.as_u16() });
    }

    let etag = resp
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    use http_body_util::BodyExt;
    let collected = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| UplinkError::Transport(anyhow::anyhow!("reading metadata body: {e}")))?;
    let value: Value = serde_json::from_slice(&collected.to_bytes())
        .map_err(|e| UplinkError::Transport(anyhow::anyhow!("parsing metadata json: {e}")))?;

    client.health.record_success();
    Ok((value, etag))
}

/// Preflights the health check, builds headers, issues the request under
/// the configured retry policy, and classifies the response.
pub(crate) async fn fetch_metadata(
    client: &HyperUplinkClient,
    name: &str,
    opts: MetadataOptions<'_>,
) -> Result<(Value, Option<String>), UplinkError> {
    client.health.preflight()?;

    let headers = crate::http::headers::build_headers(client.header_context(
        true,
        opts.etag,
        opts.incoming_via,
        opts.remote_address,
    ))?;
    let url = client.join_url(&encode_package_name(name));

    let mut attempt = 0u32;
    loop {
        client.health.mark_attempt();
        let _permit = client
            .connection_semaphore
            .acquire()
            .await
            .map_err(|e| UplinkError::Transport(anyhow::anyhow!(e)))?;

        let req = build_get_request(&url, &headers)?;
        match send(&client.http_client, req, client.timeout).await {
            Ok(resp) => return classify_response(client, resp).await,
            Err(e) => {
                attempt += 1;
                if attempt >= client.retry.max_attempts {
                    client.health.record_failure();
                    return Err(e);
                }
                client.health.record_retry_attempt(attempt);
                tokio::time::sleep(client.retry.backoff_for(attempt)).await;
            }
        }
    }
}
