use http::{Request, Response, Uri, Version};
use hyper::body::Incoming;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::proxy::context::ProxyState;
use crate::proxy::http_result::{classify_upstream_error, HttpError, HttpResult};
use crate::proxy::synthetic_response::RespBody;
use crate::proxy::transcode::{response_has_body, Transcoder};
use crate::telemetry::metrics::values;
use crate::translate::RewriteContext;

/// Forward one browser request to its origin and transcode the answer.
///
/// The whole exchange (connect, response headers and, when the body is
/// buffered for rewriting, the body as well) is bounded by
/// `timeout.upstream_secs`. Expiry drops the in-flight request.
pub async fn forward(req: Request<Incoming>, ctx: RewriteContext, state: &ProxyState) -> HttpResult<Response<RespBody>> {
    let reference = ctx.reference();
    let uri = reference
        .target_url()
        .parse::<Uri>()
        .map_err(|_| HttpError::InvalidTarget)?;

    let (parts, body) = req.into_parts();
    let method = parts.method.clone();
    let headers = state.policy.build_upstream_headers(&parts.headers, reference);

    let mut out_req = Request::new(body);
    *out_req.method_mut() = parts.method;
    *out_req.uri_mut() = uri;
    *out_req.version_mut() = Version::HTTP_11;
    *out_req.headers_mut() = headers;

    let mut transcoder = Transcoder::new(
        &ctx,
        &state.policy,
        &state.pipeline,
        &state.config.rewrite,
        state.metrics.as_ref(),
    );

    let upstream_secs = state.config.timeout.upstream_secs;
    let start = Instant::now();
    debug!(method = %method, target = %reference.target_url(), "Dispatching upstream request");

    let exchange = async {
        let resp = state.client.request(out_req).await.map_err(|e| {
            let error = classify_upstream_error(&e);
            warn!(target = %reference.target_url(), error = %e, "Upstream request failed");
            error
        })?;
        if let Some(ref m) = state.metrics {
            m.record_upstream(resp.status().as_u16(), start.elapsed().as_secs_f64());
        }
        let has_body = response_has_body(&method, resp.status());
        transcoder.transcode(resp, has_body).await
    };

    let result = match tokio::time::timeout(Duration::from_secs(upstream_secs), exchange).await {
        Ok(result) => result,
        Err(_) => {
            warn!(target = %reference.target_url(), upstream_secs, "Upstream timeout");
            if let Some(ref m) = state.metrics {
                m.record_timeout(values::TIMEOUT_UPSTREAM);
            }
            Err(HttpError::UpstreamTimeout(upstream_secs))
        }
    };

    if let Err(ref e) = result {
        transcoder.fail(e);
        if let Some(ref m) = state.metrics {
            m.record_upstream_error(e.error_type());
        }
    }
    result
}
