//! Helpers for sanitizing data before it enters log lines and span attributes.
//!
//! Logs are meant to be shared when diagnosing a batch, so these functions keep
//! directory layouts, API keys and oversized model replies out of them.

use std::path::Path;

/// Maximum number of characters of a raw model response kept in a log line.
pub const MAX_LOGGED_RESPONSE: usize = 2000;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Masks an API key, keeping a short prefix for correlation.
///
/// - `sk-abcdef123456` → `sk-a****`
/// - keys of 8 characters or fewer are fully masked
pub fn redact_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    format!("{}****", prefix)
}

/// Truncates text on a char boundary, marking the cut.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}... (truncated)", &text[..idx]),
        None => text.to_string(),
    }
}
