//! Streaming tarball fetch.
//!
//! The response body is handed back as a [`Stream`] rather than buffered:
//! a tarball can be tens of megabytes and the caller is itself usually
//! streaming it straight on to an npm client. Dropping the stream before
//! it is exhausted cancels the underlying read; unlike `search`, there is
//! no explicit abort handle here.

use std::pin::Pin;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{HeaderMap, Method, Request, StatusCode};
use hyper::header::CONTENT_LENGTH;

use futures::Stream;

use crate::client::HyperUplinkClient;
use crate::error::UplinkError;
use crate::http::agent::{empty_body, send, ReqBody};

/// Per-call options for [`crate::client::UplinkClient::fetch_tarball`].
#[derive(Default)]
pub struct TarballOptions<'a> {
    pub incoming_via: Option<&'a str>,
    pub remote_address: Option<&'a str>,
}

/// A tarball response: the advertised length (when the upstream sent
/// `Content-Length`) alongside the byte stream.
pub struct TarballResponse {
    pub content_length: Option<u64>,
    pub body: Pin<Box<dyn Stream<Item = Result<Bytes, UplinkError>> + Send>>,
}

enum ReadState {
    Reading {
        body: hyper::body::Incoming,
        expected: Option<u64>,
        seen: u64,
    },
    Done,
}

fn body_stream(
    body: hyper::body::Incoming,
    expected: Option<u64>,
) -> Pin<Box<dyn Stream<Item = Result<Bytes, UplinkError>> + Send>> {
    Box::pin(futures::stream::unfold(
        ReadState::Reading { body, expected, seen: 0 },
        |mut state| async move {
            loop {
                let ReadState::Reading { mut body, expected, seen } = state else {
                    return None;
                };
                match body.frame().await {
                    Some(Ok(frame)) => match frame.into_data() {
                        Ok(data) => {
                            let seen = seen + data.len() as u64;
                            return Some((Ok(data), ReadState::Reading { body, expected, seen }));
                        }
                        Err(_trailers) => {
                            state = ReadState::Reading { body, expected, seen };
                            continue;
                        }
                    },
                    Some(Err(e)) => {
                        return Some((
                            Err(UplinkError::Transport(anyhow::anyhow!("reading tarball body: {e}"))),
                            ReadState::Done,
                        ));
                    }
                    None => {
                        return match expected {
                            Some(expected) if expected != seen => Some((
                                Err(UplinkError::ContentMismatch { expected, actual: seen }),
                                ReadState::Done,
                            )),
                            _ => None,
                        };
                    }
                }
            }
        },
    ))
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

/// Preflights the health check, builds headers (no conditional etag;
/// tarballs are content-addressed by URL, never revalidated), issues the
/// request once, and returns the body as a stream once headers arrive.
pub(crate) async fn fetch_tarball(
    client: &HyperUplinkClient,
    url: &str,
    opts: TarballOptions<'_>,
) -> Result<TarballResponse, UplinkError> {
    client.health.preflight()?;

    let headers = crate::http::headers::build_headers(client.header_context(
        true,
        None,
        opts.incoming_via,
        opts.remote_address,
    ))?;

    client.health.mark_attempt();
    let _permit = client
        .connection_semaphore
        .acquire()
        .await
        .map_err(|e| UplinkError::Transport(anyhow::anyhow!(e)))?;

    let req = build_get_request(url, &headers)?;
    let resp = match send(&client.http_client, req, client.timeout).await {
        Ok(resp) => resp,
        Err(e) => {
            client.health.record_failure();
            return Err(e);
        }
    };

    // Status classification returns an `Err` from this function rather than
    // as the stream's first item, by design (see DESIGN.md deviations).
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        client.health.record_success();
        return Err(UplinkError::NotFileUplink);
    }
    if !status.is_success() {
        client.health.record_failure();
        return Err(UplinkError::BadStatusCode { status: status.as_u16() });
    }

    let content_length = resp
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    client.health.record_success();
    Ok(TarballResponse {
        content_length,
        body: body_stream(resp.into_body(), content_length),
    })
}
