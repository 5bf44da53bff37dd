//! Text helpers for error reports: HTML escaping, bounded truncation, request paths.

use url::Url;

/// Marker appended to truncated raw bodies.
pub const OMIT_MARKER: &str = "[omit...]";

/// Maximum length of raw error text carried in a normalized error.
pub const MAX_RAW_MESSAGE_CHARS: usize = 128;

/// Escape text so it can be embedded in HTML without being interpreted as markup.
pub fn sanitize_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Truncate to at most `max_chars` characters, marker included.
///
/// Counts chars, not bytes, so multi-byte text is never split mid-character.
pub fn truncate_string(s: &str, max_chars: usize, marker: &str) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(marker.chars().count());
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(marker);
    out
}

/// Strip the origin from a URL, keeping path, query and fragment.
///
/// Strings that do not parse as absolute URLs are returned unchanged.
pub fn request_path(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => {
            let mut path = url.path().to_string();
            if let Some(q) = url.query() {
                path.push('?');
                path.push_str(q);
            }
            if let Some(f) = url.fragment() {
                path.push('#');
                path.push_str(f);
            }
            path
        }
        Err(_) => raw.to_string(),
    }
}
