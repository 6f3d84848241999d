use std::fmt;

use url::Url;

use crate::translate::PROXY_PREFIX;

/// Scheme used to reach the origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetProtocol {
    Http,
    Https,
}

impl TargetProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetProtocol::Http => "http",
            TargetProtocol::Https => "https",
        }
    }

    pub fn from_scheme(scheme: &str) -> Option<Self> {
        if scheme.eq_ignore_ascii_case("https") {
            Some(TargetProtocol::Https)
        } else if scheme.eq_ignore_ascii_case("http") {
            Some(TargetProtocol::Http)
        } else {
            None
        }
    }
}

impl fmt::Display for TargetProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host segment as it appears after `/proxy/` in the canonical form.
///
/// https targets use the bare `host[:port]`; http targets carry their scheme
/// (`http://host[:port]`) so that they are not upgraded on the way back.
pub fn host_key(host: &str, protocol: TargetProtocol) -> String {
    match protocol {
        TargetProtocol::Https => host.to_string(),
        TargetProtocol::Http => format!("http://{host}"),
    }
}

/// A request target resolved from the `/proxy/{host}{path}` convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyReference {
    /// Proxy origin without trailing slash, e.g. `http://localhost:3000`
    pub proxy_base: String,
    /// Origin authority, `host` or `host:port` (no scheme)
    pub target_host: String,
    pub target_protocol: TargetProtocol,
    /// Origin path including the query string, always starting with `/`
    pub target_path: String,
}

impl ProxyReference {
    pub fn new(
        proxy_base: &str,
        target_host: impl Into<String>,
        target_protocol: TargetProtocol,
        target_path: impl Into<String>,
    ) -> Self {
        let mut target_path = target_path.into();
        if !target_path.starts_with('/') {
            target_path.insert(0, '/');
        }
        Self {
            proxy_base: normalize_base(proxy_base),
            target_host: target_host.into(),
            target_protocol,
            target_path,
        }
    }

    /// Parse the path-and-query of an inbound request such as
    /// `/proxy/example.com/a/b?x=1` or `/proxy/http://example.com/a`.
    ///
    /// Returns `None` when the path does not follow the convention or the
    /// host is not a valid URL authority.
    pub fn from_request_path(proxy_base: &str, path_and_query: &str) -> Option<Self> {
        let rest = path_and_query.strip_prefix(PROXY_PREFIX)?;
        let (path_part, query) = match rest.find('?') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        let (protocol, host, path) = split_target(path_part)?;
        Some(Self::new(proxy_base, host, protocol, format!("{path}{query}")))
    }

    /// Build a reference from an absolute origin URL (`https://example.com/a`).
    pub fn from_target_url(proxy_base: &str, target: &str) -> Option<Self> {
        let url = Url::parse(target).ok()?;
        let protocol = TargetProtocol::from_scheme(url.scheme())?;
        let host = authority(&url)?;
        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        Some(Self::new(proxy_base, host, protocol, path))
    }

    pub fn host_key(&self) -> String {
        host_key(&self.target_host, self.target_protocol)
    }

    /// `{proxy_base}/proxy/{host_key}{target_path}`
    pub fn canonical_url(&self) -> String {
        format!("{}{}{}{}", self.proxy_base, PROXY_PREFIX, self.host_key(), self.target_path)
    }

    /// `{proxy_base}/proxy/{host_key}/`, the href of the injected `<base>` tag
    pub fn base_href(&self) -> String {
        format!("{}{}{}/", self.proxy_base, PROXY_PREFIX, self.host_key())
    }

    /// `{scheme}://{host}`
    pub fn target_origin(&self) -> String {
        format!("{}://{}", self.target_protocol, self.target_host)
    }

    /// `{scheme}://{host}{path}`
    pub fn target_url(&self) -> String {
        format!("{}{}", self.target_origin(), self.target_path)
    }

    /// Target host without port, used as the cookie table key
    pub fn target_domain(&self) -> String {
        strip_port(&self.target_host).to_ascii_lowercase()
    }

    /// Proxy host without port, used as the rewritten cookie `Domain`
    pub fn proxy_host(&self) -> String {
        Url::parse(&self.proxy_base)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| strip_port(&self.proxy_base).to_string())
    }
}

/// Split `host/path...` (optionally `scheme://host/path...` or the collapsed
/// `scheme:/host/path...`) into its parts. The default scheme is https.
pub(crate) fn split_target(raw: &str) -> Option<(TargetProtocol, String, String)> {
    let (protocol, remainder) = strip_scheme(raw).unwrap_or((TargetProtocol::Https, raw));
    let (host, path) = match remainder.find('/') {
        Some(idx) => (&remainder[..idx], &remainder[idx..]),
        None => (remainder, "/"),
    };
    if host.is_empty() || host.contains('@') || host.starts_with(PROXY_PREFIX.trim_matches('/')) {
        return None;
    }
    let url = Url::parse(&format!("{protocol}://{host}/")).ok()?;
    let host = authority(&url)?;
    Some((protocol, host, path.to_string()))
}

fn strip_scheme(raw: &str) -> Option<(TargetProtocol, &str)> {
    for protocol in [TargetProtocol::Https, TargetProtocol::Http] {
        let scheme = protocol.as_str();
        let Some(head) = raw.get(..scheme.len() + 1) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(&format!("{scheme}:")) {
            continue;
        }
        let rest = &raw[scheme.len() + 1..];
        let rest = rest.strip_prefix("//").or_else(|| rest.strip_prefix('/'))?;
        return Some((protocol, rest));
    }
    None
}

/// `host[:port]` of a parsed URL, omitting the scheme's default port
pub(crate) fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn normalize_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

fn strip_port(authority: &str) -> &str {
    let without_scheme = authority
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(authority);
    if without_scheme.starts_with('[') {
        return without_scheme
            .find(']')
            .map(|idx| &without_scheme[..=idx])
            .unwrap_or(without_scheme);
    }
    match without_scheme.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => without_scheme,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:3000";

    #[test]
    fn parses_bare_host_as_https() {
        let reference = ProxyReference::from_request_path(BASE, "/proxy/example.com/a/b?x=1");
        let Some(reference) = reference else {
            panic!("reference should parse");
        };
        assert_eq!(reference.target_host, "example.com");
        assert_eq!(reference.target_protocol, TargetProtocol::Https);
        assert_eq!(reference.target_path, "/a/b?x=1");
        assert_eq!(reference.target_url(), "https://example.com/a/b?x=1");
    }

    #[test]
    fn parses_scheme_qualified_host() {
        for path in ["/proxy/http://127.0.0.1:8080/x", "/proxy/http:/127.0.0.1:8080/x"] {
            let Some(reference) = ProxyReference::from_request_path(BASE, path) else {
                panic!("{path} should parse");
            };
            assert_eq!(reference.target_protocol, TargetProtocol::Http);
            assert_eq!(reference.target_host, "127.0.0.1:8080");
            assert_eq!(reference.target_path, "/x");
            assert_eq!(reference.canonical_url(), "http://localhost:3000/proxy/http://127.0.0.1:8080/x");
        }
    }

    #[test]
    fn host_only_gets_root_path() {
        let reference = ProxyReference::from_request_path(BASE, "/proxy/example.com");
        assert_eq!(reference.map(|r| r.target_path), Some("/".to_string()));
    }

    #[test]
    fn default_port_is_dropped() {
        let reference = ProxyReference::from_request_path(BASE, "/proxy/https://example.com:443/");
        assert_eq!(reference.map(|r| r.target_host), Some("example.com".to_string()));
    }

    #[test]
    fn rejects_malformed_targets() {
        for path in ["/proxy/", "/proxy", "/other/example.com", "/proxy//x", "/proxy/user@host/"] {
            assert!(ProxyReference::from_request_path(BASE, path).is_none(), "{path}");
        }
    }

    #[test]
    fn proxy_host_and_domain_strip_ports() {
        let reference = ProxyReference::new(BASE, "Example.com:8443", TargetProtocol::Https, "/");
        assert_eq!(reference.proxy_host(), "localhost");
        assert_eq!(reference.target_domain(), "example.com");
        assert_eq!(reference.base_href(), "http://localhost:3000/proxy/Example.com:8443/");
    }
}
