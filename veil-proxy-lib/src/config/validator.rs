use url::Url;

use crate::config::Config;

pub fn validate(config: &Config) -> Result<(), String> {
    if let Some(origin) = &config.public_origin {
        let parsed = Url::parse(origin).map_err(|e| format!("public_origin is invalid: {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err("public_origin must use http or https".into());
        }
        if parsed.host_str().is_none() {
            return Err("public_origin must contain a host".into());
        }
        if parsed.path() != "/" || parsed.query().is_some() {
            return Err("public_origin must not contain a path or query".into());
        }
    }
    if config.timeout.upstream_secs == 0 {
        return Err("timeout.upstream_secs must be > 0".into());
    }
    if config.timeout.connect_ms == 0 {
        return Err("timeout.connect_ms must be > 0".into());
    }
    if config.rewrite.max_buffer_bytes == 0 {
        return Err("rewrite.max_buffer_bytes must be > 0".into());
    }
    if config.cookies.ttl_secs == Some(0) {
        return Err("cookies.ttl_secs must be > 0 when set".into());
    }
    Ok(())
}
