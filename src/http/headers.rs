//! Assembles outgoing request headers.
//!
//! Stages run in order: base headers (Accept/Accept-Encoding/User-Agent +
//! auth), then caller overrides (may clobber anything, including
//! `Authorization`, intentionally), then forwarding hygiene
//! (Via/X-Forwarded-For), applied last so overrides cannot clobber it.

use std::collections::HashMap;

use hyper::header::{HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, AUTHORIZATION, USER_AGENT};
use hyper::HeaderMap;

use crate::config::AuthConfig;
use crate::error::UplinkError;

const VIA_SUFFIX_TEMPLATE: &str = "1.1 {server_id} (Verdaccio)";

/// Sets a header only if the caller has not already set it.
fn set_if_absent(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if !headers.contains_key(&name) {
        if let Ok(v) = HeaderValue::from_str(value) {
            headers.insert(name, v);
        }
    }
}

/// Stage 1: Accept / Accept-Encoding / User-Agent. The `npm` literal
/// substring is always present in User-Agent.
pub fn apply_base_headers(headers: &mut HeaderMap, user_agent: &str) {
    set_if_absent(headers, ACCEPT, "application/json;");
    set_if_absent(headers, ACCEPT_ENCODING, "gzip");
    set_if_absent(headers, USER_AGENT, &format!("npm ({user_agent})"));
}

/// Stage 1b: injects `Authorization` when configured and not already
/// present. Fails with [`UplinkError::TokenRequired`] when no token
/// resolves.
pub fn apply_auth(headers: &mut HeaderMap, auth: Option<&AuthConfig>) -> Result<(), UplinkError> {
    let Some(auth) = auth else { return Ok(()) };
    if headers.contains_key(AUTHORIZATION) {
        return Ok(());
    }

    let token = auth.resolve_token()?;
    let value = format!("{} {}", auth.kind.as_str(), token);
    let header_value = HeaderValue::from_str(&value)
        .map_err(|_| UplinkError::AuthInvalid("token contains invalid header characters".into()))?;
    headers.insert(AUTHORIZATION, header_value);
    Ok(())
}

/// Stage 2: caller overrides copied verbatim, may override anything
/// including `Authorization`, intentionally.
pub fn apply_overrides(headers: &mut HeaderMap, overrides: &HashMap<String, String>) {
    for (k, v) in overrides {
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(k.as_bytes()), HeaderValue::from_str(v)) {
            headers.insert(name, value);
        }
    }
}

/// Stage 3: forwarding hygiene. Via chaining and conditional
/// X-Forwarded-For.
///
/// `incoming_via` is the `Via` value on the request this uplink call is
/// fulfilling, if any (loop prevention: prepended, then this uplink's hop is
/// appended). `has_explicit_proxy` suppresses `X-Forwarded-For` when this
/// call is traversing an explicit HTTP proxy. `remote_address` is the
/// client address to forward, when known.
pub fn apply_forwarding(
    headers: &mut HeaderMap,
    server_id: &str,
    incoming_via: Option<&str>,
    has_explicit_proxy: bool,
    remote_address: Option<&str>,
) {
    let this_hop = VIA_SUFFIX_TEMPLATE.replace("{server_id}", server_id);
    let via_value = match incoming_via {
        Some(prior) if !prior.is_empty() => format!("{prior}, {this_hop}"),
        _ => this_hop,
    };
    if let Ok(v) = HeaderValue::from_str(&via_value) {
        headers.insert(HeaderName::from_static("via"), v);
    }

    if !has_explicit_proxy {
        if let Some(addr) = remote_address {
            if let Ok(v) = HeaderValue::from_str(addr) {
                headers.insert(HeaderName::from_static("x-forwarded-for"), v);
            }
        }
    }
}

/// Clamps `Accept`/`If-None-Match` for a conditional request. These two
/// cannot be overridden by caller-supplied headers or config overrides,
/// so this runs *after* [`apply_overrides`].
pub fn apply_conditional(headers: &mut HeaderMap, etag: Option<&str>) {
    if let Some(etag) = etag {
        if let Ok(v) = HeaderValue::from_str(etag) {
            headers.insert(HeaderName::from_static("if-none-match"), v);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json;"));
    }
}

/// Everything a caller needs to assemble one outgoing request's headers.
pub struct HeaderBuildContext<'a> {
    pub user_agent: &'a str,
    pub auth: Option<&'a AuthConfig>,
    /// Whether this call site injects auth at all. The search streamer
    /// deliberately does not, since it hits a public aggregate endpoint.
    pub include_auth: bool,
    pub overrides: &'a HashMap<String, String>,
    pub server_id: &'a str,
    pub incoming_via: Option<&'a str>,
    pub has_explicit_proxy: bool,
    pub remote_address: Option<&'a str>,
    pub etag: Option<&'a str>,
}

/// Runs all header-building stages in order: base headers, auth, caller
/// overrides, conditional clamping, then forwarding hygiene.
pub fn build_headers(ctx: HeaderBuildContext<'_>) -> Result<HeaderMap, UplinkError> {
    let mut headers = HeaderMap::new();
    apply_base_headers(&mut headers, ctx.user_agent);
    if ctx.include_auth {
        apply_auth(&mut headers, ctx.auth)?;
    }
    apply_overrides(&mut headers, ctx.overrides);
    apply_conditional(&mut headers, ctx.etag);
    apply_forwarding(
        &mut headers,
        ctx.server_id,
        ctx.incoming_via,
        ctx.has_explicit_proxy,
        ctx.remote_address,
    );
    Ok(headers)
}

#[cfg(test)]
#[path = "headers_test.rs"]
mod headers_test;
