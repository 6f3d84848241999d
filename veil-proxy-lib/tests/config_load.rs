#![forbid(unsafe_code)]

use std::error::Error;
use std::io::Write;

use tempfile::NamedTempFile;
use veil_proxy_lib::config::{load_from_path, load_from_str, FingerprintStrategy};
use veil_proxy_lib::ProxyError;

type TestResult<T> = std::result::Result<T, Box<dyn Error + Send + Sync>>;

fn write_config(contents: &str) -> TestResult<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn empty_file_yields_defaults() -> TestResult<()> {
    let file = write_config("")?;
    let cfg = load_from_path(file.path())?;

    assert_eq!(cfg.listen.to_string(), "0.0.0.0:3000");
    assert!(cfg.public_origin.is_none());
    assert!(!cfg.debug_endpoints);
    assert!(cfg.rewrite.inject_script);
    assert!(!cfg.rewrite.rewrite_assets);
    assert_eq!(cfg.rewrite.max_buffer_bytes, 32 * 1024 * 1024);
    assert_eq!(cfg.timeout.upstream_secs, 60);
    assert_eq!(cfg.cookies.max_domains, 4096);
    assert_eq!(cfg.fingerprint.strategy, FingerprintStrategy::Random);
    assert!(cfg.fingerprint.cdn_evasion);
    assert!(cfg.telemetry.metrics_port.is_none());
    Ok(())
}

#[test]
fn full_file_is_honoured() -> TestResult<()> {
    let file = write_config(
        r#"
listen = "127.0.0.1:8088"
public_origin = "https://embed.example.net"
debug_endpoints = true

[rewrite]
inject_script = false
rewrite_assets = true
max_buffer_bytes = 1048576

[cookies]
max_domains = 16
ttl_secs = 600

[fingerprint]
strategy = "rotating"
cdn_evasion = false

[logging]
level = "debug"
show_target = true

[timeout]
upstream_secs = 5
connect_ms = 250
shutdown_secs = 2

[telemetry]
metrics_port = 9190
"#,
    )?;
    let cfg = load_from_path(file.path())?;

    assert_eq!(cfg.listen.port(), 8088);
    assert_eq!(cfg.public_origin.as_deref(), Some("https://embed.example.net"));
    assert!(cfg.debug_endpoints);
    assert!(!cfg.rewrite.inject_script);
    assert!(cfg.rewrite.rewrite_assets);
    assert_eq!(cfg.rewrite.max_buffer_bytes, 1_048_576);
    assert_eq!(cfg.cookies.max_domains, 16);
    assert_eq!(cfg.cookies.ttl_secs, Some(600));
    assert_eq!(cfg.fingerprint.strategy, FingerprintStrategy::Rotating);
    assert!(!cfg.fingerprint.cdn_evasion);
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(cfg.timeout.upstream_secs, 5);
    assert_eq!(cfg.timeout.connect_ms, 250);
    assert_eq!(cfg.timeout.pool_idle_secs, 90);
    assert_eq!(cfg.telemetry.metrics_port, Some(9190));
    Ok(())
}

#[test]
fn sample_config_loads() -> TestResult<()> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/veil.toml");
    let cfg = load_from_path(path)?;
    assert_eq!(cfg.listen.port(), 3000);
    Ok(())
}

#[test]
fn public_origin_with_path_is_rejected() {
    let err = load_from_str(r#"public_origin = "https://embed.example.net/app""#);
    assert!(matches!(err, Err(ProxyError::Config(msg)) if msg.contains("path")));
}

#[test]
fn zero_upstream_timeout_is_rejected() {
    let err = load_from_str("[timeout]\nupstream_secs = 0\n");
    assert!(matches!(err, Err(ProxyError::Config(_))));
}

#[test]
fn unknown_strategy_fails_to_parse() {
    let err = load_from_str("[fingerprint]\nstrategy = \"sticky\"\n");
    assert!(matches!(err, Err(ProxyError::Config(msg)) if msg.starts_with("Failed to parse config")));
}

#[test]
fn missing_file_is_a_config_error() {
    let err = load_from_path("/nonexistent/veil.toml");
    assert!(matches!(err, Err(ProxyError::Config(msg)) if msg.starts_with("Failed to read config file")));
}
