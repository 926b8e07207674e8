use super::*;
use crate::config::{AuthConfig, AuthKind, AuthSource};

fn ctx<'a>(overrides: &'a HashMap<String, String>) -> HeaderBuildContext<'a> {
    HeaderBuildContext {
        user_agent: "verdaccio/6.0.0",
        auth: None,
        include_auth: true,
        overrides,
        server_id: "srv-1",
        incoming_via: None,
        has_explicit_proxy: false,
        remote_address: None,
        etag: None,
    }
}

#[test]
fn base_headers_contain_npm_literal_and_defaults() {
    let overrides = HashMap::new();
    let headers = build_headers(ctx(&overrides)).unwrap();
    let ua = headers.get(USER_AGENT).unwrap().to_str().unwrap();
    assert!(ua.contains("npm"));
    assert_eq!(headers.get(ACCEPT).unwrap(), "application/json;");
    assert_eq!(headers.get(ACCEPT_ENCODING).unwrap(), "gzip");
}

#[test]
fn via_always_present_and_ends_with_verdaccio_marker() {
    let overrides = HashMap::new();
    let headers = build_headers(ctx(&overrides)).unwrap();
    let via = headers.get("via").unwrap().to_str().unwrap();
    assert!(via.ends_with("(Verdaccio)"));
}

#[test]
fn via_prepends_prior_hop() {
    let overrides = HashMap::new();
    let mut c = ctx(&overrides);
    c.incoming_via = Some("1.1 previous-hop (Verdaccio)");
    let headers = build_headers(c).unwrap();
    let via = headers.get("via").unwrap().to_str().unwrap();
    assert!(via.starts_with("1.1 previous-hop (Verdaccio), "));
    assert!(via.ends_with("(Verdaccio)"));
}

#[test]
fn x_forwarded_for_set_only_without_explicit_proxy() {
    let overrides = HashMap::new();
    let mut c = ctx(&overrides);
    c.remote_address = Some("203.0.113.5");
    let headers = build_headers(c).unwrap();
    assert_eq!(headers.get("x-forwarded-for").unwrap(), "203.0.113.5");

    let mut c2 = ctx(&overrides);
    c2.remote_address = Some("203.0.113.5");
    c2.has_explicit_proxy = true;
    let headers2 = build_headers(c2).unwrap();
    assert!(headers2.get("x-forwarded-for").is_none());
}

#[test]
fn auth_injected_when_configured_and_absent() {
    let overrides = HashMap::new();
    let auth = AuthConfig {
        kind: AuthKind::Bearer,
        source: AuthSource::Literal("secret-token".to_string()),
    };
    let mut c = ctx(&overrides);
    c.auth = Some(&auth);
    let headers = build_headers(c).unwrap();
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer secret-token");
}

#[test]
fn auth_not_injected_when_caller_already_set_it_via_override() {
    let mut overrides = HashMap::new();
    overrides.insert("Authorization".to_string(), "Basic preset".to_string());
    let auth = AuthConfig {
        kind: AuthKind::Bearer,
        source: AuthSource::Literal("secret-token".to_string()),
    };
    let mut c = ctx(&overrides);
    c.auth = Some(&auth);
    let headers = build_headers(c).unwrap();
    // overrides run after base-stage auth, and this override always wins regardless.
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic preset");
}

#[test]
fn overrides_may_clobber_anything_including_via() {
    let mut overrides = HashMap::new();
    overrides.insert("Via".to_string(), "custom-via".to_string());
    let headers = build_headers(ctx(&overrides)).unwrap();
    // forwarding stage runs after overrides and reinstates the canonical Via.
    let via = headers.get("via").unwrap().to_str().unwrap();
    assert!(via.ends_with("(Verdaccio)"));
}

#[test]
fn missing_token_fails_with_token_required() {
    let overrides = HashMap::new();
    let auth = AuthConfig {
        kind: AuthKind::Bearer,
        source: AuthSource::EnvVar("UPLINK_TEST_TOKEN_DOES_NOT_EXIST".to_string()),
    };
    let mut c = ctx(&overrides);
    c.auth = Some(&auth);
    let err = build_headers(c).unwrap_err();
    assert!(matches!(err, UplinkError::TokenRequired));
}

#[test]
fn conditional_sets_if_none_match_and_clamps_accept() {
    let mut overrides = HashMap::new();
    overrides.insert("Accept".to_string(), "text/plain".to_string());
    let mut c = ctx(&overrides);
    c.etag = Some("\"abc\"");
    let headers = build_headers(c).unwrap();
    assert_eq!(headers.get("if-none-match").unwrap(), "\"abc\"");
    assert_eq!(headers.get(ACCEPT).unwrap(), "application/json;");
}
