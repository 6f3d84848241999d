use serde::Deserialize;

/// Cookie table configuration
///
/// The table remembers the last `Set-Cookie` value per origin domain and
/// cookie name. Without limits it grows for the lifetime of the process.
#[derive(Debug, Deserialize, Clone)]
pub struct CookieConfig {
    /// Maximum number of origin domains kept in the table.
    /// When exceeded the least recently updated domain is evicted.
    /// 0 disables the limit.
    /// Default: 4096
    #[serde(default = "default_max_domains")]
    pub max_domains: usize,
    /// Drop a domain's cookies when it has not been updated for this many seconds
    /// Default: None (no expiry)
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self { max_domains: default_max_domains(), ttl_secs: None }
    }
}

fn default_max_domains() -> usize {
    4096
}
