//! Federated search streaming.
//!
//! The caller names an explicit cancellation point (`abort`) rather than
//! relying on stream `Drop`: the upstream response here is buffered and
//! parsed as one JSON document before any item is yielded, so there is no
//! partial-read state to cancel, only the wait for the response itself.

use std::pin::Pin;

use hyper::{HeaderMap, Method, Request, StatusCode};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use futures::Stream;

use crate::client::HyperUplinkClient;
use crate::error::UplinkError;
use crate::http::agent::{empty_body, send, ReqBody};

/// Per-call options for [`crate::client::UplinkClient::search`].
pub struct SearchOptions {
    /// Path and query of the search request, e.g. `/-/v1/search?text=foo`.
    pub path_and_query: String,
    pub abort: CancellationToken,
}

/// Collapses consecutive `/` characters, except within the scheme
/// separator (`://`).
fn collapse_duplicate_slashes(url: &str) -> String {
    let (head, rest) = match url.find("://") {
        Some(idx) => url.split_at(idx + 3),
        None => ("", url),
    };

    let mut collapsed = String::with_capacity(rest.len());
    let mut prev_was_slash = false;
    for c in rest.chars() {
        if c == '/' {
            if prev_was_slash {
                continue;
            }
            prev_was_slash = true;
        } else {
            prev_was_slash = false;
        }
        collapsed.push(c);
    }

    format!("{head}{collapsed}")
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

/// Builds the (unauthenticated) request, honours `abort`, buffers and
/// parses the response, and yields only the `objects` array entries.
/// `date`/`total` are dropped.
pub(crate) async fn search(
    client: &HyperUplinkClient,
    opts: SearchOptions,
) -> Result<Pin<Box<dyn Stream<Item = Result<Value, UplinkError>> + Send>>, UplinkError> {
    client.health.preflight()?;

    let headers = crate::http::headers::build_headers(client.header_context(false, None, None, None))?;
    let url = collapse_duplicate_slashes(&client.join_url(&opts.path_and_query));

    client.health.mark_attempt();
    let _permit = client
        .connection_semaphore
        .acquire()
        .await
        .map_err(|e| UplinkError::Transport(anyhow::anyhow!(e)))?;

    let req = build_get_request(&url, &headers)?;
    let resp = tokio::select! {
        biased;
        _ = opts.abort.cancelled() => {
            return Err(UplinkError::Transport(anyhow::anyhow!("search aborted by caller")));
        }
        result = send(&client.http_client, req, client.timeout) => {
            match result {
                Ok(resp) => resp,
                Err(e) => {
                    client.health.record_failure();
                    return Err(e);
                }
            }
        }
    };

    let status = resp.status();
    if !status.is_success() {
        client.health.record_failure();
        return Err(UplinkError::BadStatusCode { status: status.as_u16() });
    }

    use http_body_util::BodyExt;
    let collected = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| UplinkError::Transport(anyhow::anyhow!("reading search body: {e}")))?;
    let document: Value = serde_json::from_slice(&collected.to_bytes())
        .map_err(|e| UplinkError::Transport(anyhow::anyhow!("parsing search json: {e}")))?;

    client.health.record_success();

    let objects = match document.get("objects").and_then(Value::as_array) {
        Some(arr) => arr.clone(),
        None => Vec::new(),
    };

    Ok(Box::pin(futures::stream::iter(objects.into_iter().map(Ok))))
}

#[cfg(test)]
#[path = "search_test.rs"]
mod search_test;
