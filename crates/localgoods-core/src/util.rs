//! Small helpers shared by the store, the config layer and the HTTP clients.

const MAX_ERROR_TEXT_CHARS: usize = 180;

/// Trimmed text, or `None` for missing and blank input
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

pub fn is_http_url(value: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

/// Response bodies quoted in errors are cut short and kept on one line
pub fn compact_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_ERROR_TEXT_CHARS)
        .collect()
}

/// Unix seconds, the unit Supabase uses for token expiry
pub fn unix_timestamp_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Source of "now" for saved-item timestamps, in Unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
