use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::translate::{to_proxied, RewriteContext};

// Quoted absolute http(s) literals only. Template literals containing
// interpolation are skipped.
static QUOTED_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""((?i:https?)://[^"\s\\]*)"|'((?i:https?)://[^'\s\\]*)'|`((?i:https?)://[^`\s\\$]*)`"#)
        .expect("valid js url regex")
});

/// Rewrite quoted `http(s)://` string literals, keeping the original quote.
pub fn rewrite_js(js: &str, ctx: &RewriteContext) -> String {
    QUOTED_URL
        .replace_all(js, |caps: &Captures| {
            let (quote, url) = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(m), _, _) => ('"', m.as_str()),
                (_, Some(m), _) => ('\'', m.as_str()),
                (_, _, Some(m)) => ('`', m.as_str()),
                _ => return caps[0].to_string(),
            };
            format!("{quote}{}{quote}", to_proxied(url, ctx))
        })
        .into_owned()
}
