use serde::Deserialize;

/// Timeout configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutConfig {
    /// Upper bound for a whole upstream exchange in seconds:
    /// connect + response headers, and the body as well when it is buffered
    /// for rewriting. Exceeding it cancels the request and answers 504.
    /// Default: 60
    #[serde(default = "default_upstream_timeout")]
    pub upstream_secs: u64,
    /// TCP connect timeout towards the origin in milliseconds
    /// Default: 10000 (10 seconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,
    /// Idle pooled upstream connections are closed after this many seconds
    /// Default: 90
    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_secs: u64,
    /// Graceful shutdown timeout in seconds
    /// Default: 30
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_secs: u64,
    /// Total connection handling timeout in seconds (downstream side)
    /// Default: 300 seconds (5 minutes)
    #[serde(default = "default_connection_handling_timeout")]
    pub connection_handling_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            upstream_secs: default_upstream_timeout(),
            connect_ms: default_connect_timeout(),
            pool_idle_secs: default_pool_idle_timeout(),
            shutdown_secs: default_shutdown_timeout(),
            connection_handling_secs: default_connection_handling_timeout(),
        }
    }
}

fn default_upstream_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10_000
}

fn default_pool_idle_timeout() -> u64 {
    90
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_connection_handling_timeout() -> u64 {
    300
}
