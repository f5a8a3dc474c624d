//! Normalization of detail-lookup fields before they reach the session.

/// Strips every whitespace character from a phone number.
///
/// `"+1 234 567 8900"` becomes `"+12345678900"`. Idempotent. Returns `None`
/// when nothing is left, so a blank number is never treated as a recipient.
#[must_use]
pub fn normalize_phone(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        None
    } else {
        Some(compact)
    }
}

/// Trims a free-text field, mapping blank to `None`.
pub(crate) fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}
