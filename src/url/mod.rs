//! URL handling module for Clinic-Scout
//!
//! Validation of URLs before they are sent to the provider, and
//! normalization into stable cache identifiers.

mod normalize;

pub use normalize::{normalize_url, validate_target_url};

/// Returns the cache identifier for a URL
///
/// Falls back to the trimmed input when the URL cannot be normalized, so
/// that callers can still cache (and later report) invalid inputs.
pub fn cache_identifier(url_str: &str) -> String {
    normalize_url(url_str)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url_str.trim().to_string())
}
