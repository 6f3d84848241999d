use serde::Deserialize;

/// How outbound browser fingerprints are picked from the pool
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintStrategy {
    /// Uniformly random fingerprint, referer and CDN values per request
    #[default]
    Random,
    /// Walk the pool in order (deterministic, mostly useful for debugging)
    Rotating,
}

/// Outbound fingerprint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FingerprintConfig {
    /// Selection strategy
    /// Default: "random"
    #[serde(default)]
    pub strategy: FingerprintStrategy,
    /// Add CDN-specific edge headers (CloudFront, Cloudflare, Akamai, Vercel)
    /// when the target hostname matches a known provider
    /// Default: true
    #[serde(default = "default_true")]
    pub cdn_evasion: bool,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self { strategy: FingerprintStrategy::default(), cdn_evasion: true }
    }
}

fn default_true() -> bool {
    true
}
