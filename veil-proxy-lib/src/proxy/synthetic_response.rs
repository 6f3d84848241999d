use http::{header, HeaderValue, StatusCode};
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::Response;
use serde_json::Value;

use crate::policy::cors_headers;
use crate::proxy::http_result::HttpError;

pub type RespBody = BoxBody<Bytes, hyper::Error>;

pub fn full_body(bytes: impl Into<Bytes>) -> RespBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> RespBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

/// JSON response with the given status
pub fn json_response(status: StatusCode, value: &Value) -> Response<RespBody> {
    let body = value.to_string();
    let mut resp = Response::new(full_body(body));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

/// Build HTTP response with status code of 4xx and 5xx and a JSON body.
///
/// Error responses carry the CORS set so that embedding pages can read them.
pub fn synthetic_error_response(error: HttpError) -> Response<RespBody> {
    let body = error.to_json();
    let mut resp = json_response(StatusCode::from(error), &body);
    for (name, value) in cors_headers() {
        resp.headers_mut().insert(name, value);
    }
    resp
}

/// 204 answer to a CORS preflight
pub fn preflight_response() -> Response<RespBody> {
    let mut resp = Response::new(empty_body());
    *resp.status_mut() = StatusCode::NO_CONTENT;
    for (name, value) in cors_headers() {
        resp.headers_mut().insert(name, value);
    }
    resp
}
