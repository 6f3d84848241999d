use crate::rewrite::mime_type;

/// Content type implied by the extension of a request path
pub fn type_for_path(path: &str) -> Option<&'static str> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let file = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = file.rsplit_once('.')?;
    let content_type = match ext.to_ascii_lowercase().as_str() {
        "js" | "mjs" => "application/javascript",
        "css" => "text/css",
        "json" => "application/json",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => return None,
    };
    Some(content_type)
}

/// Replacement for a `text/html` content type contradicted by the path
/// extension. Any other declared type is trusted.
pub fn repair_content_type(declared: Option<&str>, path: &str) -> Option<&'static str> {
    if declared.is_none() || mime_type(declared) != "text/html" {
        return None;
    }
    type_for_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repairs_html_served_for_assets() {
        assert_eq!(repair_content_type(Some("text/html"), "/static/app.js?v=3"), Some("application/javascript"));
        assert_eq!(repair_content_type(Some("text/html; charset=utf-8"), "/site.CSS"), Some("text/css"));
        assert_eq!(repair_content_type(Some("text/html"), "/fonts/a.woff2"), Some("font/woff2"));
    }

    #[test]
    fn leaves_consistent_types() {
        assert_eq!(repair_content_type(Some("text/html"), "/index.html"), None);
        assert_eq!(repair_content_type(Some("text/html"), "/about"), None);
        assert_eq!(repair_content_type(Some("text/plain"), "/app.js"), None);
        assert_eq!(repair_content_type(None, "/app.js"), None);
    }
}
