use url::Url;

use crate::translate::reference::{authority, host_key, split_target, TargetProtocol};
use crate::translate::{RewriteContext, PROXY_PREFIX};

const PASSTHROUGH_SCHEMES: &[&str] = &["data:", "blob:", "javascript:", "mailto:", "tel:", "about:"];

/// How a URL found in content relates to the page it was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// Left untouched: empty, fragment-only, data/blob/javascript/mailto/tel/about
    /// or any non-http scheme
    Passthrough,
    /// Already in canonical `/proxy/...` form
    AlreadyProxied,
    /// `http://` or `https://`
    Absolute,
    /// `//host/path`
    ProtocolRelative,
    /// `/path`
    AbsolutePath,
    /// `path`, `./path`, `../path`, `?query`
    Relative,
}

/// Origin location recovered from a canonical proxied URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalUrl {
    pub scheme: TargetProtocol,
    pub host: String,
    pub path: String,
    /// Query string including the leading `?`
    pub query: Option<String>,
}

impl OriginalUrl {
    pub fn to_url_string(&self) -> String {
        format!(
            "{}://{}{}{}",
            self.scheme,
            self.host,
            self.path,
            self.query.as_deref().unwrap_or("")
        )
    }
}

pub fn classify(url: &str, proxy_base: &str) -> UrlKind {
    if url.is_empty() || url.starts_with('#') {
        return UrlKind::Passthrough;
    }
    let lower = url.to_ascii_lowercase();
    if PASSTHROUGH_SCHEMES.iter().any(|s| lower.starts_with(s)) {
        return UrlKind::Passthrough;
    }
    if url.starts_with("//") {
        return UrlKind::ProtocolRelative;
    }
    if url.starts_with(PROXY_PREFIX) {
        return UrlKind::AlreadyProxied;
    }
    if url.starts_with('/') {
        return UrlKind::AbsolutePath;
    }
    match scheme_of(&lower) {
        Some("http") | Some("https") => {
            let canonical = format!("{}{}", proxy_base.to_ascii_lowercase(), PROXY_PREFIX);
            if lower.starts_with(&canonical) {
                UrlKind::AlreadyProxied
            } else {
                UrlKind::Absolute
            }
        }
        Some(_) => UrlKind::Passthrough,
        None => UrlKind::Relative,
    }
}

/// Translate a URL found in content into its canonical proxied form.
///
/// Never fails: anything that cannot be parsed or is not an http(s) URL is
/// returned unchanged, and canonical URLs are left as they are.
pub fn to_proxied(url: &str, ctx: &RewriteContext) -> String {
    try_to_proxied(url, ctx).unwrap_or_else(|| url.to_string())
}

fn try_to_proxied(url: &str, ctx: &RewriteContext) -> Option<String> {
    let trimmed = url.trim();
    let base = ctx.proxy_base();
    let resolved = match classify(trimmed, base) {
        UrlKind::Passthrough | UrlKind::AlreadyProxied => return None,
        UrlKind::Absolute => Url::parse(trimmed).ok()?,
        UrlKind::ProtocolRelative => {
            let absolute = format!("{}:{}", ctx.reference().target_protocol, trimmed);
            if classify(&absolute, base) == UrlKind::AlreadyProxied {
                return None;
            }
            Url::parse(&absolute).ok()?
        }
        UrlKind::AbsolutePath | UrlKind::Relative => ctx.target_url().join(trimmed).ok()?,
    };
    canonical_from_url(&resolved, base)
}

fn canonical_from_url(url: &Url, proxy_base: &str) -> Option<String> {
    let protocol = TargetProtocol::from_scheme(url.scheme())?;
    let host = authority(url)?;
    let mut out = String::with_capacity(proxy_base.len() + host.len() + url.path().len() + 16);
    out.push_str(proxy_base);
    out.push_str(PROXY_PREFIX);
    out.push_str(&host_key(&host, protocol));
    out.push_str(url.path());
    if let Some(query) = url.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    Some(out)
}

/// Recover the origin URL from a proxied one, absolute or path-only.
///
/// Returns `None` when the path has fewer than three segments, the first
/// segment is not `proxy`, or the host segment is not a valid authority.
pub fn to_original(proxied: &str) -> Option<OriginalUrl> {
    let trimmed = proxied.trim();
    let parsed = if trimmed.starts_with('/') && !trimmed.starts_with("//") {
        Url::parse("http://proxy.invalid").ok()?.join(trimmed).ok()?
    } else {
        Url::parse(trimmed).ok()?
    };

    let path = parsed.path();
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 3 || segments[1] != "proxy" || segments[2].is_empty() {
        return None;
    }

    let rest = path.strip_prefix(PROXY_PREFIX)?;
    let (scheme, host, path) = split_target(rest)?;
    Some(OriginalUrl {
        scheme,
        host,
        path,
        query: parsed.query().map(|q| format!("?{q}")),
    })
}

fn scheme_of(lower: &str) -> Option<&str> {
    let idx = lower.find(':')?;
    let scheme = &lower[..idx];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if first.is_ascii_alphabetic() && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(scheme)
    } else {
        None
    }
}
