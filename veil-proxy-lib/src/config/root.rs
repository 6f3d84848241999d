use serde::Deserialize;
use std::net::SocketAddr;

use super::cookies::CookieConfig;
use super::fingerprinting::FingerprintConfig;
use super::rewrite::RewriteConfig;
use super::telemetry::{LoggingConfig, TelemetryConfig};
use super::timeout::TimeoutConfig;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port to listen on
    /// Example: "0.0.0.0:3000" or "127.0.0.1:8080"
    /// Default: "0.0.0.0:3000"
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Public origin of the proxy as seen by browsers, without a path
    /// Example: "https://embed.example.net"
    /// When unset, "http://{Host header}" of each request is used
    /// Default: None
    #[serde(default)]
    pub public_origin: Option<String>,
    /// Serve `/debug/translate` for URL translator introspection
    /// Default: false
    #[serde(default)]
    pub debug_endpoints: bool,
    /// Body rewriting configuration
    #[serde(default)]
    pub rewrite: RewriteConfig,
    /// Cookie table configuration
    #[serde(default)]
    pub cookies: CookieConfig,
    /// Outbound fingerprint configuration
    #[serde(default)]
    pub fingerprint: FingerprintConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Timeout configuration
    #[serde(default)]
    pub timeout: TimeoutConfig,
    /// Telemetry configuration
    /// Controls metrics and health endpoints
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            public_origin: None,
            debug_endpoints: false,
            rewrite: RewriteConfig::default(),
            cookies: CookieConfig::default(),
            fingerprint: FingerprintConfig::default(),
            logging: LoggingConfig::default(),
            timeout: TimeoutConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}
