//! Bidirectional translation between origin URLs and the proxy's
//! `/proxy/{host}{path}` convention.

mod reference;
mod translator;

use url::Url;

pub use reference::{host_key, ProxyReference, TargetProtocol};
pub use translator::{classify, to_original, to_proxied, OriginalUrl, UrlKind};

/// Path prefix shared by every canonical proxied URL
pub const PROXY_PREFIX: &str = "/proxy/";

/// Per-request translation context.
///
/// Built once when a request is routed and shared by reference with every
/// rewriter; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    reference: ProxyReference,
    request_url: String,
    target_url: Url,
}

impl RewriteContext {
    /// Returns `None` when the reference does not form a valid origin URL.
    pub fn new(reference: ProxyReference, request_url: impl Into<String>) -> Option<Self> {
        let target_url = Url::parse(&reference.target_url()).ok()?;
        Some(Self { reference, request_url: request_url.into(), target_url })
    }

    /// Context for an absolute origin URL; the request URL is its canonical form.
    pub fn for_target(proxy_base: &str, target: &str) -> Option<Self> {
        let reference = ProxyReference::from_target_url(proxy_base, target)?;
        let request_url = reference.canonical_url();
        Self::new(reference, request_url)
    }

    pub fn reference(&self) -> &ProxyReference {
        &self.reference
    }

    pub fn proxy_base(&self) -> &str {
        &self.reference.proxy_base
    }

    /// Parsed origin URL used to resolve relative references
    pub fn target_url(&self) -> &Url {
        &self.target_url
    }

    /// Inbound URL the browser requested
    pub fn request_url(&self) -> &str {
        &self.request_url
    }
}
