use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes, Frame};
use tracing::{debug, warn};

use crate::config::RewriteConfig;
use crate::policy::PolicyEngine;
use crate::proxy::decompress::{decode, Encoding};
use crate::proxy::http_result::{HttpError, HttpResult};
use crate::proxy::synthetic_response::{empty_body, full_body, RespBody};
use crate::rewrite::{ContentKind, RewritePipeline};
use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;
use crate::translate::{to_proxied, RewriteContext};

/// Lifecycle of one proxied response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeState {
    Dispatched,
    HeadersReceived,
    Redirect,
    Streaming,
    Buffering,
    Sent,
    Errored,
}

/// How an origin response is delivered once its headers are known
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Translated `Location`, empty body
    Redirect { location: String },
    /// Body piped through untouched
    Streaming,
    /// Body collected, decoded and rewritten
    Buffering { kind: ContentKind, encoding: Encoding },
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Redirect { .. } => values::DISPOSITION_REDIRECT,
            Disposition::Streaming => values::DISPOSITION_STREAMING,
            Disposition::Buffering { .. } => values::DISPOSITION_BUFFERING,
        }
    }
}

/// Pick the disposition of a response.
///
/// `headers` are the browser-facing headers, so a repaired content type is
/// what decides whether the body is rewritten. `has_body` is false for HEAD
/// requests and for statuses that never carry content.
pub fn choose_disposition(
    status: StatusCode,
    headers: &HeaderMap,
    ctx: &RewriteContext,
    config: &RewriteConfig,
    has_body: bool,
) -> Disposition {
    if status.is_redirection() {
        if let Some(location) = headers.get(header::LOCATION).and_then(|v| v.to_str().ok()) {
            return Disposition::Redirect { location: to_proxied(location, ctx) };
        }
    }
    if !has_body {
        return Disposition::Streaming;
    }

    let kind = ContentKind::from_content_type(headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()));
    let rewritable = kind == ContentKind::Html || (config.rewrite_assets && kind.is_asset());
    if !rewritable {
        return Disposition::Streaming;
    }

    let Some(encoding) = Encoding::parse(headers.get(header::CONTENT_ENCODING).and_then(|v| v.to_str().ok()))
    else {
        return Disposition::Streaming;
    };

    let declared_len = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok());
    if declared_len.is_some_and(|len| len > config.max_buffer_bytes) {
        return Disposition::Streaming;
    }

    Disposition::Buffering { kind, encoding }
}

/// Whether a response to `method` with `status` may carry a body
pub fn response_has_body(method: &http::Method, status: StatusCode) -> bool {
    method != http::Method::HEAD
        && !status.is_informational()
        && status != StatusCode::NO_CONTENT
        && status != StatusCode::NOT_MODIFIED
}

/// Body that replays an already-read prefix before the rest of `inner`
struct PrefixedBody<B> {
    prefix: Option<Bytes>,
    inner: B,
}

impl<B> Body for PrefixedBody<B>
where
    B: Body<Data = Bytes> + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        if let Some(prefix) = self.prefix.take() {
            return Poll::Ready(Some(Ok(Frame::data(prefix))));
        }
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.prefix.is_none() && self.inner.is_end_stream()
    }
}

/// Outcome of reading a body up to the buffering limit
enum Collected<B> {
    Complete(Bytes),
    Overflow(PrefixedBody<B>),
}

async fn collect_limited<B>(mut body: B, limit: usize) -> Result<Collected<B>, B::Error>
where
    B: Body<Data = Bytes> + Unpin,
{
    let mut buf = Vec::new();
    while let Some(frame) = body.frame().await {
        let Ok(data) = frame?.into_data() else {
            // trailers are dropped with the re-framed body
            continue;
        };
        buf.extend_from_slice(&data);
        if buf.len() > limit {
            return Ok(Collected::Overflow(PrefixedBody { prefix: Some(Bytes::from(buf)), inner: body }));
        }
    }
    Ok(Collected::Complete(Bytes::from(buf)))
}

/// Turns one origin response into the browser-facing response.
pub struct Transcoder<'a> {
    ctx: &'a RewriteContext,
    policy: &'a PolicyEngine,
    pipeline: &'a RewritePipeline,
    config: &'a RewriteConfig,
    metrics: Option<&'a Arc<Metrics>>,
    state: TranscodeState,
}

impl<'a> Transcoder<'a> {
    pub fn new(
        ctx: &'a RewriteContext,
        policy: &'a PolicyEngine,
        pipeline: &'a RewritePipeline,
        config: &'a RewriteConfig,
        metrics: Option<&'a Arc<Metrics>>,
    ) -> Self {
        Self { ctx, policy, pipeline, config, metrics, state: TranscodeState::Dispatched }
    }

    pub fn state(&self) -> TranscodeState {
        self.state
    }

    fn transition(&mut self, next: TranscodeState) {
        debug!(
            target_url = %self.ctx.target_url(),
            from = ?self.state,
            to = ?next,
            "Transcode state change"
        );
        self.state = next;
    }

    /// Mark the exchange as failed; the caller answers with a synthetic error.
    pub fn fail(&mut self, error: &HttpError) {
        debug!(error = %error, "Transcode failed");
        self.transition(TranscodeState::Errored);
    }

    pub async fn transcode<B>(&mut self, upstream: Response<B>, has_body: bool) -> HttpResult<Response<RespBody>>
    where
        B: Body<Data = Bytes, Error = hyper::Error> + Send + Sync + Unpin + 'static,
    {
        self.transition(TranscodeState::HeadersReceived);
        let (parts, body) = upstream.into_parts();

        let (mut headers, recorded) = self.policy.build_downstream_headers(&parts.headers, self.ctx.reference());
        if let Some(m) = self.metrics {
            m.record_cookies(recorded);
        }

        let disposition = choose_disposition(parts.status, &headers, self.ctx, self.config, has_body);
        if let Some(m) = self.metrics {
            m.record_disposition(disposition.as_str());
        }

        let body = match disposition {
            Disposition::Redirect { location } => {
                self.transition(TranscodeState::Redirect);
                drop(body);
                let location = HeaderValue::from_str(&location)
                    .map_err(|e| HttpError::FailedToGenerateDownstreamResponse(e.to_string()))?;
                headers.insert(header::LOCATION, location);
                headers.remove(header::CONTENT_ENCODING);
                headers.remove(header::CONTENT_LENGTH);
                empty_body()
            }
            Disposition::Streaming => {
                self.transition(TranscodeState::Streaming);
                body.boxed()
            }
            Disposition::Buffering { kind, encoding } => {
                self.transition(TranscodeState::Buffering);
                self.buffer(body, kind, encoding, &mut headers).await?
            }
        };

        let mut resp = Response::new(body);
        *resp.status_mut() = parts.status;
        *resp.headers_mut() = headers;
        self.transition(TranscodeState::Sent);
        Ok(resp)
    }

    async fn buffer<B>(
        &mut self,
        body: B,
        kind: ContentKind,
        encoding: Encoding,
        headers: &mut HeaderMap,
    ) -> HttpResult<RespBody>
    where
        B: Body<Data = Bytes, Error = hyper::Error> + Send + Sync + Unpin + 'static,
    {
        let limit = self.config.max_buffer_bytes;
        let raw = match collect_limited(body, limit).await {
            Ok(Collected::Complete(raw)) => raw,
            Ok(Collected::Overflow(rest)) => {
                debug!(limit, "Body exceeds buffer limit, streaming instead");
                self.transition(TranscodeState::Streaming);
                return Ok(rest.boxed());
            }
            Err(e) => return Err(HttpError::UpstreamFailure(format!("Failed to read origin body: {e}"))),
        };

        // Decoding and rewriting are CPU-bound on bodies up to `limit`
        let input = raw.clone();
        let decoded = tokio::task::spawn_blocking(move || decode(&input, encoding, limit))
            .await
            .map_err(|e| HttpError::FailedToGenerateDownstreamResponse(format!("Decode task failed: {e}")))?;
        let decoded = match decoded {
            Ok(decoded) => Bytes::from(decoded),
            Err(e) => {
                warn!(encoding = encoding.as_str(), error = %e, "Decompression failed, passing body through");
                if let Some(m) = self.metrics {
                    m.record_decompression_fallback(encoding.as_str());
                }
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(raw.len()));
                return Ok(full_body(raw));
            }
        };

        let pipeline = *self.pipeline;
        let ctx = self.ctx.clone();
        let input = decoded.clone();
        let outcome = tokio::task::spawn_blocking(move || pipeline.try_rewrite(&input, kind, &ctx))
            .await
            .map_err(|e| HttpError::FailedToGenerateDownstreamResponse(format!("Rewrite task failed: {e}")))?;
        let rewritten = match outcome {
            Ok(rewritten) => {
                if let Some(m) = self.metrics {
                    m.record_rewrite(kind.as_str());
                }
                rewritten
            }
            Err(e) => {
                warn!(kind = kind.as_str(), error = %e, "Rewrite failed, serving original body");
                if let Some(m) = self.metrics {
                    m.record_rewrite_fallback(kind.as_str());
                }
                decoded
            }
        };

        headers.remove(header::CONTENT_ENCODING);
        headers.remove(header::TRANSFER_ENCODING);
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(rewritten.len()));
        Ok(full_body(rewritten))
    }
}
