use http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

/// HTTP result type, T is typically a hyper::Response
/// HttpError is used to generate a synthetic JSON error response
pub(crate) type HttpResult<T> = std::result::Result<T, HttpError>;

/// Describes things that can go wrong while proxying one request
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Invalid target URL")]
    InvalidTarget,

    #[error("Not found")]
    NotFound,

    #[error("Upstream timed out after {0}s")]
    UpstreamTimeout(u64),

    #[error("Connect timed out: {0}")]
    ConnectTimeout(String),

    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    #[error("Host not found: {0}")]
    HostNotFound(String),

    #[error("Upstream request failed: {0}")]
    UpstreamFailure(String),

    #[error("Failed to generate upstream request: {0}")]
    FailedToGenerateUpstreamRequest(String),

    #[error("Failed to generate downstream response: {0}")]
    FailedToGenerateDownstreamResponse(String),
}

impl HttpError {
    /// Metric label
    pub fn error_type(&self) -> &'static str {
        match self {
            HttpError::InvalidTarget => "invalid_target",
            HttpError::NotFound => "not_found",
            HttpError::UpstreamTimeout(_) => "upstream_timeout",
            HttpError::ConnectTimeout(_) => "connect_timeout",
            HttpError::ConnectionRefused(_) => "connection_refused",
            HttpError::HostNotFound(_) => "host_not_found",
            HttpError::UpstreamFailure(_) => "upstream_failure",
            HttpError::FailedToGenerateUpstreamRequest(_) => "upstream_request",
            HttpError::FailedToGenerateDownstreamResponse(_) => "downstream_response",
        }
    }

    /// `{error, details}` body; routing errors carry no details
    pub fn to_json(&self) -> Value {
        match self {
            HttpError::InvalidTarget | HttpError::NotFound => json!({ "error": self.to_string() }),
            HttpError::UpstreamTimeout(_) | HttpError::ConnectTimeout(_) => {
                json!({ "error": "Upstream timeout", "details": self.to_string() })
            }
            HttpError::ConnectionRefused(_) | HttpError::HostNotFound(_) | HttpError::UpstreamFailure(_) => {
                json!({ "error": "Bad gateway", "details": self.to_string() })
            }
            HttpError::FailedToGenerateUpstreamRequest(_) | HttpError::FailedToGenerateDownstreamResponse(_) => {
                json!({ "error": "Internal proxy error", "details": self.to_string() })
            }
        }
    }
}

impl From<HttpError> for StatusCode {
    fn from(e: HttpError) -> StatusCode {
        match e {
            HttpError::InvalidTarget => StatusCode::BAD_REQUEST,
            HttpError::NotFound => StatusCode::NOT_FOUND,
            HttpError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            HttpError::ConnectTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            HttpError::ConnectionRefused(_) => StatusCode::BAD_GATEWAY,
            HttpError::HostNotFound(_) => StatusCode::BAD_GATEWAY,
            HttpError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            HttpError::FailedToGenerateUpstreamRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HttpError::FailedToGenerateDownstreamResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Classify a failed origin exchange by walking the error's source chain.
pub fn classify_upstream_error(err: &(dyn std::error::Error + 'static)) -> HttpError {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    let message = err.to_string();
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => return HttpError::ConnectionRefused(message),
                std::io::ErrorKind::TimedOut => return HttpError::ConnectTimeout(message),
                _ => {}
            }
        }
        let text = e.to_string().to_ascii_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return HttpError::HostNotFound(message);
        }
        if text.contains("connection refused") {
            return HttpError::ConnectionRefused(message);
        }
        current = e.source();
    }
    HttpError::UpstreamFailure(message)
}
