use serde_json::Value;

use crate::rewrite::RewriteError;
use crate::translate::{to_proxied, RewriteContext};

/// Translate URL-like string values, preserving key order.
///
/// Returns `Ok(None)` when nothing changed so the caller can keep the
/// original bytes.
pub fn rewrite_json(text: &str, ctx: &RewriteContext) -> Result<Option<String>, RewriteError> {
    let mut value: Value = serde_json::from_str(text)?;
    if walk(&mut value, ctx) == 0 {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(&value)?))
}

fn walk(value: &mut Value, ctx: &RewriteContext) -> usize {
    match value {
        Value::String(s) if looks_like_url(s) => {
            let proxied = to_proxied(s, ctx);
            if proxied == *s {
                0
            } else {
                *s = proxied;
                1
            }
        }
        Value::Array(items) => items.iter_mut().map(|v| walk(v, ctx)).sum(),
        Value::Object(map) => map.values_mut().map(|v| walk(v, ctx)).sum(),
        _ => 0,
    }
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with('/')
}
