//! Header, cookie and fingerprint policy applied in both directions.

pub mod cdn;
pub mod cookies;
pub mod csp;
pub mod downstream;
pub mod fingerprint;
pub mod mime;
pub mod upstream;

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;

use crate::config::Config;
use crate::translate::ProxyReference;

pub use cdn::{CdnEvasionProfile, CdnProvider};
pub use cookies::{CookieStore, CookieTable};
pub use downstream::{build_downstream_headers, DownstreamResponse};
pub use fingerprint::{
    fingerprint_source, BrowserFingerprint, EvasionSeed, FingerprintSource, RandomFingerprints,
    RotatingFingerprints,
};
pub use upstream::{build_upstream_headers, UpstreamRequest};

/// Header names not provided by the `http` crate
pub mod names {
    use http::HeaderName;

    pub const SEC_CH_UA: HeaderName = HeaderName::from_static("sec-ch-ua");
    pub const SEC_CH_UA_MOBILE: HeaderName = HeaderName::from_static("sec-ch-ua-mobile");
    pub const SEC_CH_UA_PLATFORM: HeaderName = HeaderName::from_static("sec-ch-ua-platform");
    pub const SEC_CH_VIEWPORT_WIDTH: HeaderName = HeaderName::from_static("sec-ch-viewport-width");
    pub const VIEWPORT_WIDTH: HeaderName = HeaderName::from_static("viewport-width");
    pub const DPR: HeaderName = HeaderName::from_static("dpr");
    pub const SEC_FETCH_DEST: HeaderName = HeaderName::from_static("sec-fetch-dest");
    pub const SEC_FETCH_MODE: HeaderName = HeaderName::from_static("sec-fetch-mode");
    pub const SEC_FETCH_SITE: HeaderName = HeaderName::from_static("sec-fetch-site");
    pub const SEC_FETCH_USER: HeaderName = HeaderName::from_static("sec-fetch-user");
}

pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Request headers that disclose the proxy to the origin
pub const PROXY_REVEALING: &[&str] =
    &["forwarded", "via", "x-real-ip", "x-original-url", "x-rewrite-url", "x-client-ip", "client-ip"];

const PROXY_REVEALING_PREFIXES: &[&str] = &["x-forwarded-", "x-proxy-"];

/// Response headers that stop a page from rendering inside a frame
pub const EMBEDDING_BLOCKERS: &[&str] = &[
    "x-frame-options",
    "cross-origin-opener-policy",
    "cross-origin-embedder-policy",
    "cross-origin-resource-policy",
    "strict-transport-security",
];

pub const CORS_ALLOW_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS,PATCH";
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Requested-With, Accept, Origin";

/// Permissive CORS set added to every proxied response and preflight
pub fn cors_headers() -> [(HeaderName, HeaderValue); 4] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
        (header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(CORS_ALLOW_METHODS)),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(CORS_ALLOW_HEADERS)),
        (header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true")),
    ]
}

/// Lower-cased header names listed in `Connection`
pub(crate) fn connection_tokens(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

pub(crate) fn is_hop_by_hop(name: &str, connection_tokens: &[String]) -> bool {
    HOP_BY_HOP.contains(&name) || connection_tokens.iter().any(|t| t == name)
}

pub(crate) fn is_proxy_revealing(name: &str) -> bool {
    PROXY_REVEALING.contains(&name) || PROXY_REVEALING_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Policy engine shared by every request.
///
/// Holds the process-wide cookie table and the randomness capability.
pub struct PolicyEngine {
    cookies: Arc<dyn CookieStore>,
    fingerprints: Arc<dyn FingerprintSource>,
    cdn_evasion: bool,
}

impl PolicyEngine {
    pub fn new(cookies: Arc<dyn CookieStore>, fingerprints: Arc<dyn FingerprintSource>, cdn_evasion: bool) -> Self {
        Self { cookies, fingerprints, cdn_evasion }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(CookieTable::from_config(&config.cookies)),
            fingerprint_source(config.fingerprint.strategy),
            config.fingerprint.cdn_evasion,
        )
    }

    pub fn cookies(&self) -> &Arc<dyn CookieStore> {
        &self.cookies
    }

    /// Outbound headers for `reference`, with a fresh fingerprint and seed.
    pub fn build_upstream_headers(&self, inbound: &HeaderMap, reference: &ProxyReference) -> HeaderMap {
        let seed = self.fingerprints.next_seed();
        build_upstream_headers(&UpstreamRequest {
            inbound,
            reference,
            fingerprint: self.fingerprints.next_fingerprint(),
            seed: &seed,
            cookies: self.cookies.as_ref(),
            cdn_evasion: self.cdn_evasion,
        })
    }

    /// Browser-facing headers for an origin response, plus cookies recorded.
    pub fn build_downstream_headers(&self, upstream: &HeaderMap, reference: &ProxyReference) -> (HeaderMap, usize) {
        let origin_domain = reference.target_domain();
        let proxy_host = reference.proxy_host();
        let target_path = reference.target_path.split('?').next().unwrap_or("/");
        build_downstream_headers(&DownstreamResponse {
            upstream,
            origin_domain: &origin_domain,
            proxy_host: &proxy_host,
            target_path,
            cookies: self.cookies.as_ref(),
        })
    }
}
