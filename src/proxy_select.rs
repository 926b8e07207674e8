//! Decides whether an explicit HTTP/HTTPS proxy applies to a given target
//! host, honouring `no_proxy` wildcard (suffix) matching.

use crate::config::{MainConfig, UplinkConfig};

/// Resolves the proxy variable to use for `scheme`, preferring the uplink's
/// own setting over the main server's fallback.
fn resolve_proxy_var<'a>(
    uplink: &'a UplinkConfig,
    main: &'a MainConfig,
    https: bool,
) -> Option<&'a str> {
    let (uplink_val, main_val) = if https {
        (&uplink.https_proxy, &main.https_proxy)
    } else {
        (&uplink.http_proxy, &main.http_proxy)
    };
    uplink_val
        .as_deref()
        .or(main_val.as_deref())
        .filter(|s| !s.is_empty())
}

/// Resolves the `no_proxy` list to use, preferring the uplink's own setting.
fn resolve_no_proxy<'a>(uplink: &'a UplinkConfig, main: &'a MainConfig) -> Option<&'a str> {
    uplink
        .no_proxy
        .as_deref()
        .or(main.no_proxy.as_deref())
        .filter(|s| !s.is_empty())
}

/// Prepends a leading `.` to `s` if it doesn't already have one.
fn dotted(s: &str) -> String {
    if s.starts_with('.') {
        s.to_string()
    } else {
        format!(".{s}")
    }
}

/// Returns true if `hostname` matches a `no_proxy` entry via suffix matching.
fn matches_no_proxy(hostname: &str, no_proxy: &str) -> bool {
    let normalized_host = dotted(hostname);
    no_proxy.split(',').map(str::trim).filter(|e| !e.is_empty()).any(|entry| {
        if entry == "*" {
            return true;
        }
        normalized_host.ends_with(&dotted(entry))
    })
}

/// Resolves the explicit proxy URL (if any) that applies for `hostname` under
/// `scheme` ("http" or "https"), or `None` when the direct agent should be
/// used. Pure function, no I/O.
pub fn resolve_proxy(
    hostname: &str,
    scheme: &str,
    uplink: &UplinkConfig,
    main: &MainConfig,
) -> Option<String> {
    let https = scheme.eq_ignore_ascii_case("https");
    let proxy = resolve_proxy_var(uplink, main, https)?;

    if let Some(no_proxy) = resolve_no_proxy(uplink, main) {
        if matches_no_proxy(hostname, no_proxy) {
            return None;
        }
    }

    Some(proxy.to_string())
}

#[cfg(test)]
#[path = "proxy_select_test.rs"]
mod proxy_select_test;
