use http::header::{self, HeaderMap, HeaderValue};

use crate::policy::cookies::CookieStore;
use crate::policy::csp::strip_frame_ancestors;
use crate::policy::mime::repair_content_type;
use crate::policy::{connection_tokens, cors_headers, is_hop_by_hop, EMBEDDING_BLOCKERS};

/// Inputs of one origin response
pub struct DownstreamResponse<'a> {
    pub upstream: &'a HeaderMap,
    /// Cookie table key of the origin (host without port)
    pub origin_domain: &'a str,
    /// Host written into rewritten cookie `Domain` attributes
    pub proxy_host: &'a str,
    /// Origin path, used for content-type repair
    pub target_path: &'a str,
    pub cookies: &'a dyn CookieStore,
}

/// Headers returned to the browser for an origin response.
///
/// Returns the header map and the number of cookies recorded.
pub fn build_downstream_headers(resp: &DownstreamResponse<'_>) -> (HeaderMap, usize) {
    let upstream = resp.upstream;
    let tokens = connection_tokens(upstream);
    let mut out = HeaderMap::with_capacity(upstream.len() + 4);
    let mut recorded = 0;

    for (name, value) in upstream {
        let lower = name.as_str();
        if is_hop_by_hop(lower, &tokens)
            || EMBEDDING_BLOCKERS.contains(&lower)
            || lower.starts_with("access-control-")
        {
            continue;
        }
        match lower {
            "content-security-policy" | "content-security-policy-report-only" => {
                let Some(stripped) = value.to_str().ok().and_then(strip_frame_ancestors) else {
                    continue;
                };
                if let Ok(v) = HeaderValue::from_str(&stripped) {
                    out.append(name.clone(), v);
                }
            }
            "set-cookie" => {
                let Ok(raw) = value.to_str() else {
                    continue;
                };
                if let Some((cookie_name, pair)) = cookie_pair(raw) {
                    resp.cookies.record(resp.origin_domain, cookie_name, pair);
                    recorded += 1;
                }
                if let Ok(v) = HeaderValue::from_str(&rewrite_set_cookie_domain(raw, resp.proxy_host)) {
                    out.append(header::SET_COOKIE, v);
                }
            }
            _ => {
                out.append(name.clone(), value.clone());
            }
        }
    }

    for (name, value) in cors_headers() {
        out.insert(name, value);
    }

    let declared = upstream.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
    if let Some(repaired) = repair_content_type(declared, resp.target_path) {
        tracing::debug!(path = resp.target_path, content_type = repaired, "Repairing content type");
        out.insert(header::CONTENT_TYPE, HeaderValue::from_static(repaired));
    }

    (out, recorded)
}

/// Rewrite the `Domain` attribute to `proxy_host`; every other attribute is
/// kept verbatim.
pub fn rewrite_set_cookie_domain(set_cookie: &str, proxy_host: &str) -> String {
    set_cookie
        .split(';')
        .enumerate()
        .map(|(i, part)| {
            let trimmed = part.trim();
            let is_domain = i > 0
                && trimmed
                    .split_once('=')
                    .is_some_and(|(k, _)| k.trim().eq_ignore_ascii_case("domain"));
            if is_domain {
                format!("Domain={proxy_host}")
            } else {
                trimmed.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// Name and raw `name=value` of the first Set-Cookie segment
fn cookie_pair(set_cookie: &str) -> Option<(&str, &str)> {
    let pair = set_cookie.split(';').next()?.trim();
    let (name, _) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, pair))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::cookies::CookieTable;

    fn build(upstream: &HeaderMap, path: &str, table: &CookieTable) -> HeaderMap {
        build_downstream_headers(&DownstreamResponse {
            upstream,
            origin_domain: "origin.com",
            proxy_host: "localhost",
            target_path: path,
            cookies: table,
        })
        .0
    }

    #[test]
    fn removes_embedding_blockers() {
        let mut upstream = HeaderMap::new();
        upstream.insert("x-frame-options", HeaderValue::from_static("DENY"));
        upstream.insert("cross-origin-opener-policy", HeaderValue::from_static("same-origin"));
        upstream.insert("strict-transport-security", HeaderValue::from_static("max-age=1"));
        upstream.insert("content-security-policy", HeaderValue::from_static("frame-ancestors 'none'"));
        upstream.insert(
            "content-security-policy-report-only",
            HeaderValue::from_static("default-src 'self'; frame-ancestors 'self'"),
        );
        upstream.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        upstream.insert("x-app", HeaderValue::from_static("1"));

        let out = build(&upstream, "/", &CookieTable::default());
        assert!(!out.contains_key("x-frame-options"));
        assert!(!out.contains_key("cross-origin-opener-policy"));
        assert!(!out.contains_key("strict-transport-security"));
        assert!(!out.contains_key("content-security-policy"));
        assert!(!out.contains_key("transfer-encoding"));
        assert_eq!(
            out.get("content-security-policy-report-only"),
            Some(&HeaderValue::from_static("default-src 'self'"))
        );
        assert_eq!(out.get("access-control-allow-origin"), Some(&HeaderValue::from_static("*")));
        assert_eq!(out.get("x-app"), Some(&HeaderValue::from_static("1")));
    }

    #[test]
    fn set_cookie_is_recorded_and_rewritten() {
        let table = CookieTable::default();
        let mut upstream = HeaderMap::new();
        upstream.append("set-cookie", HeaderValue::from_static("id=abc; Domain=origin.com; Path=/; HttpOnly"));
        upstream.append("set-cookie", HeaderValue::from_static("theme=dark; Max-Age=60"));

        let out = build(&upstream, "/", &table);
        let cookies: Vec<_> = out.get_all("set-cookie").iter().filter_map(|v| v.to_str().ok()).collect();
        assert_eq!(cookies, vec!["id=abc; Domain=localhost; Path=/; HttpOnly", "theme=dark; Max-Age=60"]);
        assert_eq!(table.lookup("origin.com", "id").as_deref(), Some("id=abc"));
        assert_eq!(table.lookup("origin.com", "theme").as_deref(), Some("theme=dark"));
    }

    #[test]
    fn repairs_mislabeled_assets() {
        let mut upstream = HeaderMap::new();
        upstream.insert("content-type", HeaderValue::from_static("text/html"));
        let out = build(&upstream, "/app.js?v=1", &CookieTable::default());
        assert_eq!(out.get("content-type"), Some(&HeaderValue::from_static("application/javascript")));
    }
}
