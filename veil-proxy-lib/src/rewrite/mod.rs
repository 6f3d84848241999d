//! MIME-dispatched body rewriting.
//!
//! Every rewriter is fail-open: when parsing fails the original bytes are
//! returned and the page is served unmodified.

pub mod css;
pub mod html;
pub mod js;
pub mod json;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RewriteConfig;
use crate::translate::RewriteContext;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("body is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("html rewrite failed: {0}")]
    Html(String),
    #[error("json parse failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Body family, resolved once from the `Content-Type` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Css,
    JavaScript,
    Json,
    Other,
}

impl ContentKind {
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        Self::from_mime(&mime_type(content_type))
    }

    pub fn from_mime(mime: &str) -> Self {
        match mime {
            "text/html" => ContentKind::Html,
            "text/css" => ContentKind::Css,
            "application/javascript"
            | "text/javascript"
            | "application/x-javascript"
            | "application/ecmascript"
            | "text/ecmascript" => ContentKind::JavaScript,
            "application/json" => ContentKind::Json,
            _ => ContentKind::Other,
        }
    }

    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Html => "html",
            ContentKind::Css => "css",
            ContentKind::JavaScript => "javascript",
            ContentKind::Json => "json",
            ContentKind::Other => "other",
        }
    }

    /// Non-HTML text bodies that are only buffered when asset rewriting is on
    pub fn is_asset(&self) -> bool {
        matches!(self, ContentKind::Css | ContentKind::JavaScript | ContentKind::Json)
    }
}

/// First `;`-separated segment of a content type, trimmed and lower-cased.
/// Defaults to `text/plain`.
pub fn mime_type(content_type: Option<&str>) -> String {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "text/plain".to_string())
}

/// Body rewriter configured from `[rewrite]`
#[derive(Debug, Clone, Copy)]
pub struct RewritePipeline {
    inject_script: bool,
}

impl Default for RewritePipeline {
    fn default() -> Self {
        Self { inject_script: true }
    }
}

impl RewritePipeline {
    pub fn new(config: &RewriteConfig) -> Self {
        Self { inject_script: config.inject_script }
    }

    /// Rewrite `body`, returning the original bytes when anything fails.
    pub fn rewrite(&self, body: &Bytes, content_type: Option<&str>, ctx: &RewriteContext) -> Bytes {
        let kind = ContentKind::from_content_type(content_type);
        match self.try_rewrite(body, kind, ctx) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                warn!(kind = kind.as_str(), error = %e, "Rewrite failed, serving original body");
                body.clone()
            }
        }
    }

    pub fn try_rewrite(&self, body: &Bytes, kind: ContentKind, ctx: &RewriteContext) -> Result<Bytes, RewriteError> {
        if kind == ContentKind::Other {
            return Ok(body.clone());
        }
        let text = std::str::from_utf8(body)?;
        let rewritten = match kind {
            ContentKind::Html => html::rewrite_html(text, ctx, self.inject_script)?,
            ContentKind::Css => css::rewrite_css(text, ctx),
            ContentKind::JavaScript => js::rewrite_js(text, ctx),
            ContentKind::Json => match json::rewrite_json(text, ctx)? {
                Some(changed) => changed,
                None => return Ok(body.clone()),
            },
            ContentKind::Other => return Ok(body.clone()),
        };
        debug!(kind = kind.as_str(), before = body.len(), after = rewritten.len(), "Body rewritten");
        Ok(Bytes::from(rewritten))
    }
}

/// Rewrite with default settings (script injection on).
pub fn rewrite_body(body: &Bytes, content_type: Option<&str>, ctx: &RewriteContext) -> Bytes {
    RewritePipeline::default().rewrite(body, content_type, ctx)
}
