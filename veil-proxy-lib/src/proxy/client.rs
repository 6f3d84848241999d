use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use crate::config::TimeoutConfig;
use crate::error::{ProxyError, Result};

/// Pooled client reaching both http and https origins
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Incoming>;

/// Build the shared upstream client.
///
/// Canceled requests are never retried: a request is sent to the origin at
/// most once.
pub fn build_upstream_client(timeout: &TimeoutConfig) -> Result<UpstreamClient> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_nodelay(true);
    http.set_connect_timeout(Some(Duration::from_millis(timeout.connect_ms)));

    let https = HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
        .map_err(|e| ProxyError::Tls(format!("Failed to load TLS roots: {e}")))?
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    let mut builder = Client::builder(TokioExecutor::new());
    builder
        .pool_idle_timeout(Duration::from_secs(timeout.pool_idle_secs))
        .retry_canceled_requests(false);

    Ok(builder.build(https))
}
