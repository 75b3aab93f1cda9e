//! String helpers shared across the pipeline stages.
//!
//! Everything here clips by Unicode scalar values, never by raw bytes, so a
//! multibyte character at a cap boundary can never split and panic.

/// Clip a string to at most `max` characters.
///
/// Returns the input unchanged (as an owned `String`) when it already fits.
/// Used for every bounded field: summary (600), snippet (140), title (200),
/// and the model-input prefix (9000).
pub fn clip_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and a
/// count of what was dropped appended, so log lines stay readable when a
/// model returns a wall of text.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        format!("{}…(+{} chars)", clip_chars(s, max), total - max)
    }
}

/// Hostname of a URL, or an empty string when the URL does not parse.
///
/// The empty string is deliberate: candidates with malformed URLs are still
/// surfaced by the search stage and filtered later, so this helper must not
/// fail.
pub fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}
