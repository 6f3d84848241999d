/// Remove `frame-ancestors` from a Content-Security-Policy value.
///
/// Directives are split on `;`, empty ones dropped, the rest rebuilt with
/// `"; "`. Returns `None` when nothing is left.
pub fn strip_frame_ancestors(policy: &str) -> Option<String> {
    let directives: Vec<&str> = policy
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .filter(|d| {
            let name = d.split_whitespace().next().unwrap_or_default();
            !name.eq_ignore_ascii_case("frame-ancestors")
        })
        .collect();
    if directives.is_empty() {
        None
    } else {
        Some(directives.join("; "))
    }
}
