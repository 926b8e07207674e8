//! Builds the per-uplink HTTP agent: a direct TLS-capable connector, or one
//! tunnelled through an explicit HTTP(S) proxy.
//!
//! Deliberately hand-rolled rather than built on `hyper-rustls`'s connector
//! builder: an explicit proxy requires `CONNECT`-tunnelling control that
//! builder doesn't expose. `tokio-rustls` is used directly instead, driving
//! the socket manually, wrapped for hyper via `hyper_util::rt::TokioIo`.

use std::fs;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use hyper::Uri;
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{Certificate, ClientConfig, RootCertStore, ServerName};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tower::Service;

use crate::config::AgentOptions;
use crate::error::UplinkError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Accepts any server certificate. Used only when `strict_ssl` is `false`,
/// mirroring the config knob's original meaning (disable TLS verification,
/// not disable TLS itself).
struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: std::time::SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}

/// Builds the TLS client config for an uplink: native root store, optionally
/// extended with a configured CA bundle, or no verification at all when
/// `strict_ssl` is false.
pub fn build_tls_config(ca_path: Option<&str>, strict_ssl: bool) -> Result<Arc<ClientConfig>, UplinkError> {
    let builder = ClientConfig::builder().with_safe_defaults();

    if !strict_ssl {
        return Ok(Arc::new(
            builder
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth(),
        ));
    }

    let mut roots = RootCertStore::empty();
    if let Ok(native) = rustls_native_certs::load_native_certs() {
        for cert in native {
            let _ = roots.add(&Certificate(cert.0));
        }
    }

    if let Some(path) = ca_path {
        let pem = fs::read(path).map_err(|e| UplinkError::InvalidCaBundle {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let mut reader = io::BufReader::new(pem.as_slice());
        let certs = rustls_pemfile::certs(&mut reader).map_err(|e| UplinkError::InvalidCaBundle {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        for cert in certs {
            roots
                .add(&Certificate(cert))
                .map_err(|e| UplinkError::InvalidCaBundle {
                    path: path.to_string(),
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(Arc::new(
        builder.with_root_certificates(roots).with_no_client_auth(),
    ))
}

#[derive(Clone)]
struct ResolvedProxy {
    host: String,
    port: u16,
}

fn parse_proxy_target(proxy_url: &str) -> Result<ResolvedProxy, UplinkError> {
    let parsed = url::Url::parse(proxy_url).map_err(|e| UplinkError::InvalidUrl(e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| UplinkError::InvalidUrl(proxy_url.to_string()))?
        .to_string();
    let default_port = if parsed.scheme() == "https" { 443 } else { 80 };
    Ok(ResolvedProxy {
        host,
        port: parsed.port().unwrap_or(default_port),
    })
}

/// Either end of a connection this connector can hand back to hyper: a bare
/// TCP socket (plain HTTP, or the proxy leg before `CONNECT`-tunnelling) or
/// a TLS session (direct HTTPS, or HTTPS tunnelled through a proxy).
pub enum UplinkStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for UplinkStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            UplinkStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            UplinkStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for UplinkStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            UplinkStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            UplinkStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            UplinkStream::Plain(s) => Pin::new(s).poll_flush(cx),
            UplinkStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            UplinkStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            UplinkStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

impl Connection for UplinkStream {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

/// Reads an HTTP `CONNECT` response off `stream` until the blank line that
/// terminates the header block, and errors unless the status is `200`.
async fn read_connect_response(stream: &mut TcpStream) -> Result<(), BoxError> {
    let mut buf = Vec::with_capacity(512);
    let mut byte = [0u8; 1];
    loop {
        let n = stream.read(&mut byte).await?;
        if n == 0 {
            return Err("proxy closed connection during CONNECT handshake".into());
        }
        buf.push(byte[0]);
        if buf.ends_with(b"\r\n\r\n") {
            break;
        }
        if buf.len() > 8192 {
            return Err("CONNECT response headers too large".into());
        }
    }
    let head = String::from_utf8_lossy(&buf);
    let status_line = head.lines().next().unwrap_or("");
    if !status_line.contains("200") {
        return Err(format!("proxy CONNECT failed: {status_line}").into());
    }
    Ok(())
}

/// Connector bound to one uplink: connects directly, or tunnels through a
/// resolved explicit proxy. Cloned cheaply (shares the TLS config).
#[derive(Clone)]
pub struct UplinkConnector {
    proxy: Option<ResolvedProxy>,
    tls: Arc<ClientConfig>,
}

impl UplinkConnector {
    pub fn direct(tls: Arc<ClientConfig>) -> Self {
        Self { proxy: None, tls }
    }

    pub fn via_proxy(proxy_url: &str, tls: Arc<ClientConfig>) -> Result<Self, UplinkError> {
        Ok(Self {
            proxy: Some(parse_proxy_target(proxy_url)?),
            tls,
        })
    }

    pub fn has_proxy(&self) -> bool {
        self.proxy.is_some()
    }
}

impl Service<Uri> for UplinkConnector {
    type Response = TokioIo<UplinkStream>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let proxy = self.proxy.clone();
        let tls_config = self.tls.clone();

        Box::pin(async move {
            let is_https = uri.scheme_str() == Some("https");
            let target_host = uri.host().ok_or("request uri has no host")?.to_string();
            let target_port = uri
                .port_u16()
                .unwrap_or(if is_https { 443 } else { 80 });

            let stream = match proxy {
                Some(p) => {
                    let mut tcp = TcpStream::connect((p.host.as_str(), p.port)).await?;
                    tcp.set_nodelay(true).ok();
                    if is_https {
                        let connect_req = format!(
                            "CONNECT {target_host}:{target_port} HTTP/1.1\r\nHost: {target_host}:{target_port}\r\n\r\n"
                        );
                        tcp.write_all(connect_req.as_bytes()).await?;
                        read_connect_response(&mut tcp).await?;
                        let name = ServerName::try_from(target_host.as_str())
                            .map_err(|_| "invalid server name for TLS SNI")?;
                        let tls_stream = TlsConnector::from(tls_config).connect(name, tcp).await?;
                        UplinkStream::Tls(Box::new(tls_stream))
                    } else {
                        // Plain HTTP through a proxy: hyper sends the request in
                        // absolute-form, so the proxy forwards it as-is; no
                        // CONNECT tunnel is needed.
                        UplinkStream::Plain(tcp)
                    }
                }
                None => {
                    let tcp = TcpStream::connect((target_host.as_str(), target_port)).await?;
                    tcp.set_nodelay(true).ok();
                    if is_https {
                        let name = ServerName::try_from(target_host.as_str())
                            .map_err(|_| "invalid server name for TLS SNI")?;
                        let tls_stream = TlsConnector::from(tls_config).connect(name, tcp).await?;
                        UplinkStream::Tls(Box::new(tls_stream))
                    } else {
                        UplinkStream::Plain(tcp)
                    }
                }
            };

            Ok(TokioIo::new(stream))
        })
    }
}

/// Connection-pool tuning applied when building the `hyper_util` client.
/// Defaults to `maxSockets=40`, `maxFreeSockets=10`.
pub fn apply_agent_options(
    builder: hyper_util::client::legacy::Builder,
    opts: &AgentOptions,
) -> hyper_util::client::legacy::Builder {
    let mut builder = builder;
    if opts.keep_alive {
        builder.pool_max_idle_per_host(opts.max_free_sockets);
    } else {
        builder.pool_max_idle_per_host(0);
    }
    builder
}

#[cfg(test)]
#[path = "connector_test.rs"]
mod connector_test;
