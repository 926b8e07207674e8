//! Error taxonomy surfaced by every public operation on an uplink client.

use thiserror::Error;

/// Stable error kinds a caller (the enclosing registry server) can match on.
///
/// Transport errors are not a distinct variant; they are wrapped in
/// [`UplinkError::Transport`] so the underlying `hyper`/IO error stays
/// inspectable.
#[derive(Debug, Error)]
pub enum UplinkError {
    /// Circuit breaker is open; preflight refused to hit the network.
    #[error("uplink is offline (too many recent failures)")]
    UplinkOffline,

    /// `auth` was configured but no token could be resolved.
    #[error("auth is configured but no token could be resolved")]
    TokenRequired,

    /// `auth.type` is neither `Basic` nor `Bearer`.
    #[error("unsupported auth type: {0}")]
    AuthInvalid(String),

    /// A duration literal could not be parsed.
    #[error("invalid interval: {0}")]
    BadInterval(String),

    /// HTTP 404 on a metadata GET.
    #[error("package not found upstream")]
    NotFoundUplink,

    /// HTTP 404 on a tarball GET.
    #[error("tarball not found upstream")]
    NotFileUplink,

    /// HTTP 304 on a conditional metadata GET. Upstream sent no body.
    #[error("not modified: reuse cached copy")]
    NotModifiedNoData,

    /// Any other non-2xx status not otherwise classified.
    #[error("bad status code from uplink: {status}")]
    BadStatusCode {
        /// The numeric HTTP status code, exposed as a side channel.
        status: u16,
    },

    /// Tarball byte count did not match the advertised `Content-Length`.
    #[error("content length mismatch: expected {expected}, got {actual}")]
    ContentMismatch {
        /// Bytes advertised via the `Content-Length` response header.
        expected: u64,
        /// Bytes actually observed before the stream ended.
        actual: u64,
    },

    /// The request's base URL, tarball URL, or proxy URL did not parse.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The CA bundle configured for this uplink could not be read or parsed.
    #[error("failed to load CA bundle from {path}: {reason}")]
    InvalidCaBundle {
        /// Configured path to the PEM bundle.
        path: String,
        /// Human-readable reason (I/O or PEM parse failure).
        reason: String,
    },

    /// DNS, TCP connect, TLS handshake, request write, response read, or
    /// timeout failure. Propagated unchanged from the transport.
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

impl UplinkError {
    /// Returns the HTTP status side-channel, when this error carries one.
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            UplinkError::BadStatusCode { status } => Some(*status),
            UplinkError::NotFoundUplink => Some(404),
            UplinkError::NotFileUplink => Some(404),
            UplinkError::NotModifiedNoData => Some(304),
            _ => None,
        }
    }
}
