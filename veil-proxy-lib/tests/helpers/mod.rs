//! Shared helpers for integration tests: free ports, in-process origins and
//! a proxy instance with deterministic fingerprints.
#![allow(dead_code)]

use std::convert::Infallible;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use veil_proxy_lib::policy::{CookieTable, PolicyEngine, RotatingFingerprints};
use veil_proxy_lib::{serve, Config, ProxyState};

pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Reserve a port that nothing listens on
pub fn pick_free_port() -> TestResult<SocketAddr> {
    let listener = StdTcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Spawn an HTTP origin answering every request with `handler`.
pub async fn spawn_origin<F>(handler: F) -> TestResult<SocketAddr>
where
    F: Fn(&Request<Incoming>) -> Response<Full<Bytes>> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handler = Arc::new(handler);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                continue;
            };
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let svc = service_fn(move |req: Request<Incoming>| {
                    let resp = handler(&req);
                    async move { Ok::<_, Infallible>(resp) }
                });
                let _ = ConnBuilder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(stream), svc)
                    .await;
            });
        }
    });
    Ok(addr)
}

/// Spawn an origin that accepts connections and never answers.
pub async fn spawn_stalled_origin() -> TestResult<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    Ok(addr)
}

/// Running proxy; dropping it stops the accept loop.
pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: watch::Sender<bool>,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Proxied URL of `origin_path` on the plain-http origin at `origin`.
    pub fn proxied(&self, origin: SocketAddr, origin_path: &str) -> String {
        format!("http://{}/proxy/http://{}{}", self.addr, origin, origin_path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Start a proxy on a free port with rotating fingerprints.
pub async fn spawn_proxy(config: Config) -> TestResult<TestProxy> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let policy = PolicyEngine::new(
        Arc::new(CookieTable::default()),
        Arc::new(RotatingFingerprints::default()),
        false,
    );
    let state = Arc::new(ProxyState::with_policy(Arc::new(config), policy, None)?);
    let (shutdown, rx) = watch::channel(false);
    tokio::spawn(serve(listener, state, rx));
    Ok(TestProxy { addr, shutdown })
}

/// Client that reports redirects instead of following them
pub fn client() -> TestResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()?)
}

pub fn gzip(data: &[u8]) -> TestResult<Vec<u8>> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
