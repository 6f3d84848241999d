#![forbid(unsafe_code)]

mod helpers;

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use helpers::{client, gzip, pick_free_port, spawn_origin, spawn_proxy, spawn_stalled_origin, TestResult};
use http::{header, HeaderMap, StatusCode};
use http_body_util::Full;
use hyper::Response;
use veil_proxy_lib::config::{Config, TimeoutConfig};
use veil_proxy_lib::script::MARKER;

const PAGE: &str = r#"<!DOCTYPE html><html><head><title>origin</title></head><body><a href="/next">next</a><img src="https://cdn.example.com/logo.png"></body></html>"#;

fn respond(status: StatusCode, headers: &[(&'static str, &'static str)], body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(body.into()));
    *resp.status_mut() = status;
    for (name, value) in headers {
        resp.headers_mut().append(*name, http::HeaderValue::from_static(value));
    }
    resp
}

#[tokio::test]
async fn gzip_html_is_decoded_rewritten_and_resized() -> TestResult<()> {
    let compressed = Bytes::from(gzip(PAGE.as_bytes())?);
    let origin = spawn_origin(move |_| {
        respond(
            StatusCode::OK,
            &[("content-type", "text/html; charset=utf-8"), ("content-encoding", "gzip")],
            compressed.clone(),
        )
    })
    .await?;
    let proxy = spawn_proxy(Config::default()).await?;

    let resp = client()?.get(proxy.proxied(origin, "/page")).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::CONTENT_ENCODING).is_none());
    let declared: usize = resp
        .headers()
        .get(header::CONTENT_LENGTH)
        .ok_or("missing content-length")?
        .to_str()?
        .parse()?;

    let body = resp.text().await?;
    assert_eq!(declared, body.len());
    let proxy_base = format!("http://{}", proxy.addr);
    assert!(body.contains(&format!(r#"href="{proxy_base}/proxy/http://{origin}/next""#)));
    assert!(body.contains(&format!(r#"src="{proxy_base}/proxy/cdn.example.com/logo.png""#)));
    assert!(body.contains(&format!(r#"<base href="{proxy_base}/proxy/http://{origin}/">"#)));
    assert_eq!(body.matches(MARKER).count(), 1);
    Ok(())
}

#[tokio::test]
async fn redirect_location_points_back_through_proxy() -> TestResult<()> {
    let origin = spawn_origin(|_| respond(StatusCode::FOUND, &[("location", "/new")], "moved")).await?;
    let proxy = spawn_proxy(Config::default()).await?;

    let resp = client()?.get(proxy.proxied(origin, "/old")).send().await?;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(header::LOCATION).ok_or("missing location")?.to_str()?,
        format!("http://{}/proxy/http://{}/new", proxy.addr, origin)
    );
    assert!(resp.bytes().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn non_html_is_streamed_untouched() -> TestResult<()> {
    let script = br#"fetch("https://api.example.com/v1")"#;
    let compressed = Bytes::from(gzip(script)?);
    let expected = compressed.clone();
    let origin = spawn_origin(move |_| {
        respond(
            StatusCode::OK,
            &[("content-type", "application/javascript"), ("content-encoding", "gzip")],
            compressed.clone(),
        )
    })
    .await?;
    let proxy = spawn_proxy(Config::default()).await?;

    let resp = client()?.get(proxy.proxied(origin, "/app.js")).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_ENCODING).ok_or("encoding dropped")?, "gzip");
    assert_eq!(resp.bytes().await?, expected);
    Ok(())
}

#[tokio::test]
async fn corrupt_gzip_html_passes_through_raw() -> TestResult<()> {
    let origin = spawn_origin(|_| {
        respond(
            StatusCode::OK,
            &[("content-type", "text/html"), ("content-encoding", "gzip")],
            "this is not gzip",
        )
    })
    .await?;
    let proxy = spawn_proxy(Config::default()).await?;

    let resp = client()?.get(proxy.proxied(origin, "/")).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_ENCODING).ok_or("encoding dropped")?, "gzip");
    assert_eq!(resp.bytes().await?, Bytes::from_static(b"this is not gzip"));
    Ok(())
}

#[tokio::test]
async fn embedding_blockers_are_removed() -> TestResult<()> {
    let origin = spawn_origin(|_| {
        respond(
            StatusCode::OK,
            &[
                ("content-type", "text/plain"),
                ("x-frame-options", "DENY"),
                ("content-security-policy", "default-src 'self'; frame-ancestors 'none'"),
                ("access-control-allow-origin", "https://only.example.com"),
            ],
            "ok",
        )
    })
    .await?;
    let proxy = spawn_proxy(Config::default()).await?;

    let resp = client()?.get(proxy.proxied(origin, "/")).send().await?;
    let headers = resp.headers();
    assert!(headers.get("x-frame-options").is_none());
    assert_eq!(headers.get("content-security-policy").ok_or("csp dropped")?, "default-src 'self'");
    assert_eq!(headers.get("access-control-allow-origin").ok_or("cors missing")?, "*");
    Ok(())
}

#[tokio::test]
async fn origin_sees_fingerprint_instead_of_proxy_headers() -> TestResult<()> {
    let seen: Arc<Mutex<Option<HeaderMap>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let origin = spawn_origin(move |req| {
        if let Ok(mut slot) = sink.lock() {
            *slot = Some(req.headers().clone());
        }
        respond(StatusCode::OK, &[("content-type", "text/plain")], "ok")
    })
    .await?;
    let proxy = spawn_proxy(Config::default()).await?;

    client()?
        .get(proxy.proxied(origin, "/"))
        .header("x-forwarded-for", "10.0.0.1")
        .header("via", "1.1 corp-proxy")
        .header("user-agent", "curl/8.0")
        .send()
        .await?;

    let headers = seen.lock().map_err(|_| "poisoned")?.clone().ok_or("origin not reached")?;
    assert!(headers.get("x-forwarded-for").is_none());
    assert!(headers.get("via").is_none());
    assert_eq!(headers.get(header::HOST).ok_or("missing host")?.to_str()?, origin.to_string());
    let ua = headers.get(header::USER_AGENT).ok_or("missing user-agent")?.to_str()?;
    assert!(ua.starts_with("Mozilla/5.0"));
    Ok(())
}

#[tokio::test]
async fn origin_cookies_win_over_stale_browser_cookies() -> TestResult<()> {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let origin = spawn_origin(move |req| {
        let cookie = req
            .headers()
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if let Ok(mut log) = sink.lock() {
            log.push(cookie);
        }
        respond(
            StatusCode::OK,
            &[("content-type", "text/plain"), ("set-cookie", "sid=fresh; Domain=127.0.0.1; Path=/")],
            "ok",
        )
    })
    .await?;
    let proxy = spawn_proxy(Config::default()).await?;
    let http = client()?;

    let first = http.get(proxy.proxied(origin, "/login")).send().await?;
    let set_cookie = first.headers().get(header::SET_COOKIE).ok_or("missing set-cookie")?.to_str()?;
    assert_eq!(set_cookie, format!("sid=fresh; Domain={}; Path=/", proxy.addr.ip()));

    http.get(proxy.proxied(origin, "/account"))
        .header(header::COOKIE, "sid=stale; theme=dark")
        .send()
        .await?;

    let log = seen.lock().map_err(|_| "poisoned")?.clone();
    assert_eq!(log.len(), 2);
    assert!(log[1].contains("sid=fresh"));
    assert!(!log[1].contains("sid=stale"));
    assert!(log[1].contains("theme=dark"));
    Ok(())
}

#[tokio::test]
async fn invalid_target_is_rejected() -> TestResult<()> {
    let proxy = spawn_proxy(Config::default()).await?;

    let resp = client()?.get(proxy.url("/proxy/")).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await?, r#"{"error":"Invalid target URL"}"#);
    Ok(())
}

#[tokio::test]
async fn bare_proxy_path_is_rejected() -> TestResult<()> {
    let proxy = spawn_proxy(Config::default()).await?;

    let resp = client()?.get(proxy.url("/proxy")).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await?, r#"{"error":"Invalid target URL"}"#);
    Ok(())
}

#[tokio::test]
async fn unknown_host_is_bad_gateway() -> TestResult<()> {
    let proxy = spawn_proxy(Config::default()).await?;

    // .invalid never resolves
    let resp = client()?.get(proxy.url("/proxy/http://veil-proxy-test.invalid/")).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"], "Bad gateway");
    Ok(())
}

#[tokio::test]
async fn refused_connection_is_bad_gateway() -> TestResult<()> {
    let dead = pick_free_port()?;
    let proxy = spawn_proxy(Config::default()).await?;

    let resp = client()?.get(proxy.proxied(dead, "/")).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"], "Bad gateway");
    assert!(body["details"].is_string());
    Ok(())
}

#[tokio::test]
async fn stalled_origin_times_out() -> TestResult<()> {
    let origin = spawn_stalled_origin().await?;
    let config = Config { timeout: TimeoutConfig { upstream_secs: 1, ..TimeoutConfig::default() }, ..Config::default() };
    let proxy = spawn_proxy(config).await?;

    let resp = client()?.get(proxy.proxied(origin, "/")).send().await?;
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"], "Upstream timeout");
    Ok(())
}

#[tokio::test]
async fn preflight_is_answered_locally() -> TestResult<()> {
    let dead = pick_free_port()?;
    let proxy = spawn_proxy(Config::default()).await?;

    let resp = client()?
        .request(reqwest::Method::OPTIONS, proxy.proxied(dead, "/api"))
        .header("origin", "https://embedder.example")
        .header("access-control-request-method", "POST")
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(resp.headers().get("access-control-allow-methods").is_some());
    Ok(())
}

#[tokio::test]
async fn local_routes() -> TestResult<()> {
    let proxy = spawn_proxy(Config { debug_endpoints: true, ..Config::default() }).await?;
    let http = client()?;

    let health = http.get(proxy.url("/health")).send().await?;
    assert_eq!(health.status(), StatusCode::OK);
    let health: serde_json::Value = health.json().await?;
    assert_eq!(health["status"], "healthy");

    let missing = http.get(proxy.url("/nothing-here")).send().await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let translated: serde_json::Value = http
        .get(proxy.url("/debug/translate?url=%2Fnew&target=https%3A%2F%2Fexample.com%2Fold"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(translated["proxied"], format!("http://{}/proxy/example.com/new", proxy.addr));
    assert!(translated["original"].is_null());
    Ok(())
}

#[tokio::test]
async fn debug_endpoint_is_off_by_default() -> TestResult<()> {
    let proxy = spawn_proxy(Config::default()).await?;
    let resp = client()?
        .get(proxy.url("/debug/translate?url=%2Fa&target=https%3A%2F%2Fexample.com%2F"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}
