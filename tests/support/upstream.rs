//! Throwaway upstream registry for integration tests: an `axum::Router`
//! bound to port 0, polled ready via `reqwest` before handing control back.

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct UpstreamServer {
    addr: String,
    handle: JoinHandle<()>,
    shutdown: tokio::sync::oneshot::Sender<()>,
}

impl UpstreamServer {
    pub async fn start(router: Router) -> Self {
        let router = router.route("/healthz", get(|| async { "ok" }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, router);
            tokio::select! {
                _ = server => {}
                _ = shutdown_rx => {}
            }
        });

        wait_ready(&format!("http://{addr}/healthz")).await;

        Self { addr, handle, shutdown: shutdown_tx }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn close(self) {
        let _ = self.shutdown.send(());
        self.handle.abort();
    }
}

async fn wait_ready(url: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while tokio::time::Instant::now() < deadline {
        if let Ok(resp) = reqwest::get(url).await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("upstream test server never became ready: {url}");
}
