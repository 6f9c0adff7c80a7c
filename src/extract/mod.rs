pub mod fields;
pub mod rules;
pub mod structure;

/// Normalizes a native length property: the browser reports `-1` for
/// "no limit", which becomes `None` rather than leaking the sentinel.
pub fn normalize_length(raw: i64) -> Option<u32> {
    u32::try_from(raw).ok()
}

/// Empty strings mean "attribute absent" for optional text properties.
pub fn non_empty(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}
