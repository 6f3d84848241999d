use serde::Deserialize;

/// Body rewriting configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RewriteConfig {
    /// Inject the client reinforcement script into HTML documents
    /// Default: true
    #[serde(default = "default_true")]
    pub inject_script: bool,
    /// Also buffer and rewrite CSS, JavaScript and JSON responses.
    /// When false only HTML is buffered; every other type is streamed as-is.
    /// Default: false
    #[serde(default)]
    pub rewrite_assets: bool,
    /// Largest body (in bytes) that will be buffered for rewriting.
    /// Responses that declare a bigger Content-Length are streamed untouched.
    /// Default: 33554432 (32 MiB)
    #[serde(default = "default_max_buffer_bytes")]
    pub max_buffer_bytes: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            inject_script: true,
            rewrite_assets: false,
            max_buffer_bytes: default_max_buffer_bytes(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_buffer_bytes() -> usize {
    32 * 1024 * 1024
}
