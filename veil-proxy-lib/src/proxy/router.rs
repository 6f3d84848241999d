use std::sync::Arc;

use http::{header, Method, Request, Response, StatusCode};
use hyper::body::Incoming;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::proxy::context::ProxyState;
use crate::proxy::forwarding::forward;
use crate::proxy::http_result::{HttpError, HttpResult};
use crate::proxy::synthetic_response::{json_response, preflight_response, synthetic_error_response, RespBody};
use crate::telemetry::health_check_response;
use crate::translate::{to_original, to_proxied, ProxyReference, RewriteContext, PROXY_PREFIX};

pub const HEALTH_PATH: &str = "/health";
pub const DEBUG_TRANSLATE_PATH: &str = "/debug/translate";

/// Entry point of the hyper service: routes one request and always answers.
pub async fn handle_request(req: Request<Incoming>, state: Arc<ProxyState>) -> Response<RespBody> {
    let start = Instant::now();
    let method = req.method().clone();

    let resp = match route(req, &state).await {
        Ok(resp) => resp,
        Err(e) => {
            if StatusCode::from(e.clone()).is_server_error() {
                error!(error = %e, "Proxy request failed");
            } else {
                debug!(error = %e, "Request rejected");
            }
            synthetic_error_response(e)
        }
    };

    if let Some(ref m) = state.metrics {
        m.record_request(method.as_str(), resp.status().as_u16(), start.elapsed().as_secs_f64());
    }
    resp
}

async fn route(req: Request<Incoming>, state: &ProxyState) -> HttpResult<Response<RespBody>> {
    let path = req.uri().path();

    // `/proxy` alone names no target
    if path == PROXY_PREFIX.trim_end_matches('/') {
        return Err(HttpError::InvalidTarget);
    }
    if path.starts_with(PROXY_PREFIX) {
        if req.method() == Method::OPTIONS {
            return Ok(preflight_response());
        }
        let ctx = proxy_context(&req, state)?;
        return forward(req, ctx, state).await;
    }

    match (req.method(), path) {
        (&Method::GET, HEALTH_PATH) => Ok(health_check_response()),
        (&Method::GET, DEBUG_TRANSLATE_PATH) if state.config.debug_endpoints => debug_translate(&req, state),
        _ => Err(HttpError::NotFound),
    }
}

fn request_host(req: &Request<Incoming>) -> Option<&str> {
    req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
}

/// Resolve the target of a `/proxy/...` request.
fn proxy_context(req: &Request<Incoming>, state: &ProxyState) -> HttpResult<RewriteContext> {
    let base = state.proxy_base(request_host(req)).ok_or(HttpError::InvalidTarget)?;
    let path_and_query = req.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let reference = ProxyReference::from_request_path(&base, path_and_query).ok_or(HttpError::InvalidTarget)?;
    let request_url = format!("{base}{path_and_query}");
    RewriteContext::new(reference, request_url).ok_or(HttpError::InvalidTarget)
}

/// `GET /debug/translate?url=...&target=...`
///
/// Reports how the translator treats `url` when it appears on the page at
/// `target`, and what original URL it denotes if it is already proxied.
fn debug_translate(req: &Request<Incoming>, state: &ProxyState) -> HttpResult<Response<RespBody>> {
    let query = req.uri().query().unwrap_or("");
    let mut url = None;
    let mut target = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "url" => url = Some(value.into_owned()),
            "target" => target = Some(value.into_owned()),
            _ => {}
        }
    }
    let url = url.ok_or(HttpError::InvalidTarget)?;
    let base = state.proxy_base(request_host(req)).ok_or(HttpError::InvalidTarget)?;

    let proxied = match target {
        Some(target) => {
            let ctx = RewriteContext::for_target(&base, &target).ok_or(HttpError::InvalidTarget)?;
            Some(to_proxied(&url, &ctx))
        }
        None => None,
    };
    let original = to_original(&url).map(|o| o.to_url_string());

    Ok(json_response(StatusCode::OK, &json!({ "proxied": proxied, "original": original })))
}
