use http::header::{self, HeaderMap, HeaderValue};

use crate::policy::cdn::CdnEvasionProfile;
use crate::policy::cookies::CookieStore;
use crate::policy::fingerprint::{BrowserFingerprint, EvasionSeed};
use crate::policy::{connection_tokens, is_hop_by_hop, is_proxy_revealing, names};
use crate::translate::{to_original, ProxyReference};

/// Inputs of one outbound request
pub struct UpstreamRequest<'a> {
    pub inbound: &'a HeaderMap,
    pub reference: &'a ProxyReference,
    pub fingerprint: &'a BrowserFingerprint,
    pub seed: &'a EvasionSeed,
    pub cookies: &'a dyn CookieStore,
    pub cdn_evasion: bool,
}

/// Headers sent to the origin for an inbound request.
pub fn build_upstream_headers(req: &UpstreamRequest<'_>) -> HeaderMap {
    let inbound = req.inbound;
    let reference = req.reference;
    let tokens = connection_tokens(inbound);
    let mut out = HeaderMap::with_capacity(inbound.len() + 16);

    for (name, value) in inbound {
        let lower = name.as_str();
        if is_hop_by_hop(lower, &tokens) || is_proxy_revealing(lower) || is_replaced(lower) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }

    insert_str(&mut out, header::HOST, &reference.target_host);
    apply_fingerprint(&mut out, req.fingerprint);

    if !inbound.contains_key(header::ACCEPT) {
        insert_str(&mut out, header::ACCEPT, req.fingerprint.accept);
    }
    if !inbound.keys().any(|n| n.as_str().starts_with("sec-fetch-")) {
        insert_str(&mut out, names::SEC_FETCH_DEST, "document");
        insert_str(&mut out, names::SEC_FETCH_MODE, "navigate");
        insert_str(&mut out, names::SEC_FETCH_SITE, "none");
        insert_str(&mut out, names::SEC_FETCH_USER, "?1");
    }

    let referer = inbound
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|r| translate_referer(r, reference))
        .unwrap_or_else(|| req.seed.search_referer.to_string());
    insert_str(&mut out, header::REFERER, &referer);

    if let Some(origin) = inbound.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        if is_on_proxy(origin, &reference.proxy_base) {
            insert_str(&mut out, header::ORIGIN, &reference.target_origin());
        } else {
            insert_str(&mut out, header::ORIGIN, origin);
        }
    }

    if req.cdn_evasion {
        if let Some(profile) = CdnEvasionProfile::for_host(&reference.target_host) {
            for (name, value) in profile.headers(req.seed) {
                out.insert(name, value);
            }
        }
    }

    let domain = reference.target_domain();
    let cookie = inbound
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|v| map_cookie_header(v, &domain, req.cookies))
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    if !cookie.is_empty() {
        insert_str(&mut out, header::COOKIE, &cookie);
    }

    out
}

/// Replace each `name=value` pair with the last value the origin set for
/// that name; unknown names pass verbatim.
pub fn map_cookie_header(cookie: &str, domain: &str, store: &dyn CookieStore) -> String {
    cookie
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let name = pair.split_once('=').map(|(n, _)| n.trim()).unwrap_or(pair);
            store.lookup(domain, name).unwrap_or_else(|| pair.to_string())
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// Proxied referers go back to the origin URL; referers on the proxy itself
// that are not proxied are replaced. External referers are kept.
fn translate_referer(referer: &str, reference: &ProxyReference) -> Option<String> {
    if !is_on_proxy(referer, &reference.proxy_base) {
        return Some(referer.to_string());
    }
    to_original(referer).map(|original| original.to_url_string())
}

fn is_on_proxy(url: &str, proxy_base: &str) -> bool {
    let url = url.to_ascii_lowercase();
    let base = proxy_base.to_ascii_lowercase();
    url == base || url.starts_with(&format!("{base}/"))
}

fn apply_fingerprint(out: &mut HeaderMap, fp: &BrowserFingerprint) {
    insert_str(out, header::USER_AGENT, fp.user_agent);
    insert_str(out, header::ACCEPT_LANGUAGE, fp.accept_language);
    insert_str(out, header::ACCEPT_ENCODING, fp.accept_encoding);
    if let Some(ua) = fp.sec_ch_ua {
        insert_str(out, names::SEC_CH_UA, ua);
    }
    if let Some(mobile) = fp.sec_ch_ua_mobile {
        insert_str(out, names::SEC_CH_UA_MOBILE, mobile);
    }
    if let Some(platform) = fp.sec_ch_ua_platform {
        insert_str(out, names::SEC_CH_UA_PLATFORM, platform);
    }
    let width = fp.viewport_width.to_string();
    insert_str(out, names::VIEWPORT_WIDTH, &width);
    insert_str(out, names::SEC_CH_VIEWPORT_WIDTH, &width);
    insert_str(out, names::DPR, fp.device_pixel_ratio);
}

// Inbound headers that are always rebuilt from the fingerprint or context
fn is_replaced(name: &str) -> bool {
    matches!(
        name,
        "host"
            | "user-agent"
            | "accept-language"
            | "accept-encoding"
            | "referer"
            | "origin"
            | "cookie"
            | "dpr"
            | "viewport-width"
    ) || name.starts_with("sec-ch-")
}

fn insert_str<K>(out: &mut HeaderMap, name: K, value: &str)
where
    K: http::header::IntoHeaderName,
{
    if let Ok(value) = HeaderValue::from_str(value) {
        out.insert(name, value);
    }
}
