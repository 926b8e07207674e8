mod support;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use registry_uplink::{MetadataOptions, UplinkClient, UplinkError};

use support::upstream::UpstreamServer;

async fn always_500(hits: Arc<AtomicU32>) -> StatusCode {
    hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// `max_fails=2`: two consecutive failures trip the breaker, the third call
/// fails fast (preflight, no network hit), matching spec scenario 3.
#[tokio::test]
async fn trips_open_after_max_fails_then_fails_fast_without_hitting_network() {
    let hits = Arc::new(AtomicU32::new(0));
    let hits_clone = hits.clone();
    let router = Router::new().route("/broken-pkg", get(move || always_500(hits_clone.clone())));
    let server = UpstreamServer::start(router).await;

    let mut cfg = support::common::uplink_config(&server.base_url());
    cfg.max_fails = 2;
    cfg.fail_timeout = "60s".to_string();
    let client = registry_uplink::HyperUplinkClient::new("test-uplink", &cfg, &support::common::main_config()).unwrap();

    for _ in 0..2 {
        let err = client
            .get_remote_metadata("broken-pkg", MetadataOptions { etag: None, incoming_via: None, remote_address: None })
            .await
            .unwrap_err();
        assert!(matches!(err, UplinkError::BadStatusCode { status: 500 }));
    }
    assert!(client.is_offline());
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    let err = client
        .get_remote_metadata("broken-pkg", MetadataOptions { etag: None, incoming_via: None, remote_address: None })
        .await
        .unwrap_err();
    assert!(matches!(err, UplinkError::UplinkOffline));
    // the preflight check rejected this call before any network I/O happened.
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    server.close().await;
}

/// After `fail_timeout` elapses the breaker goes half-open: the next request
/// reaches upstream again, and a single success resets the counter.
#[tokio::test]
async fn half_open_after_fail_timeout_allows_network_again() {
    let hits = Arc::new(AtomicU32::new(0));
    let hits_clone = hits.clone();
    let router = Router::new().route("/broken-pkg", get(move || always_500(hits_clone.clone())));
    let server = UpstreamServer::start(router).await;

    let mut cfg = support::common::uplink_config(&server.base_url());
    cfg.max_fails = 1;
    cfg.fail_timeout = "50ms".to_string();
    let client = registry_uplink::HyperUplinkClient::new("test-uplink", &cfg, &support::common::main_config()).unwrap();

    let err = client
        .get_remote_metadata("broken-pkg", MetadataOptions { etag: None, incoming_via: None, remote_address: None })
        .await
        .unwrap_err();
    assert!(matches!(err, UplinkError::BadStatusCode { status: 500 }));
    assert!(client.is_offline());

    tokio::time::sleep(std::time::Duration::from_millis(80)).await;
    assert!(!client.is_offline());

    let err = client
        .get_remote_metadata("broken-pkg", MetadataOptions { etag: None, incoming_via: None, remote_address: None })
        .await
        .unwrap_err();
    assert!(matches!(err, UplinkError::BadStatusCode { status: 500 }));
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    server.close().await;
}
