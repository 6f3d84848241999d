use hyper::Response;
use hyper::StatusCode;
use serde_json::json;

use crate::proxy::synthetic_response::{json_response, RespBody};

pub const SERVICE_NAME: &str = "veil-proxy";

/// Health check response - always returns 200 if process is running
pub fn health_check_response() -> Response<RespBody> {
    json_response(
        StatusCode::OK,
        &json!({
            "status": "healthy",
            "service": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Liveness check - always returns 200 if process is running
pub fn live_check_response() -> Response<RespBody> {
    json_response(StatusCode::OK, &json!({"status": "alive"}))
}
