use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::translate::{to_proxied, RewriteContext};

static URL_FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^'"\s)][^)]*?))\s*\)"#).expect("valid css url regex")
});

static IMPORT_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)@import\s+(?:"([^"]*)"|'([^']*)')"#).expect("valid css import regex"));

/// Rewrite `url(...)` references and `@import "..."` strings.
///
/// Output always uses the single-quoted `url('...')` form.
pub fn rewrite_css(css: &str, ctx: &RewriteContext) -> String {
    let imported = IMPORT_STRING.replace_all(css, |caps: &Captures| {
        let target = first_group(caps);
        format!("@import {}", quoted_url(&to_proxied(target, ctx)))
    });
    URL_FN
        .replace_all(&imported, |caps: &Captures| quoted_url(&to_proxied(first_group(caps), ctx)))
        .into_owned()
}

fn first_group<'a>(caps: &Captures<'a>) -> &'a str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
        .unwrap_or("")
}

fn quoted_url(url: &str) -> String {
    format!("url('{}')", url.replace('\'', "%27"))
}
