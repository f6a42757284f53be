//! Content cache for provider responses
//!
//! This module handles:
//! - Hashing (kind, identifier) pairs into stable cache keys
//! - Persisting responses with an expiry in SQLite
//! - Best-effort reads and writes that never fail the caller
//! - The research activity log

mod content;
mod schema;
mod sqlite;
mod traits;

pub use content::{CacheStats, ContentCache, MAX_TTL_SECONDS};
pub use sqlite::SqliteCacheStore;
pub use traits::{CacheError, CacheResult, CacheStore};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Opens or creates a SQLite-backed cache store
pub fn open_cache_store(path: &Path) -> CacheResult<SqliteCacheStore> {
    SqliteCacheStore::new(path)
}

/// Kind of provider response stored in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    Scrape,
    Crawl,
    Search,
    Extract,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scrape => "scrape",
            Self::Crawl => "crawl",
            Self::Search => "search",
            Self::Extract => "extract",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "scrape" => Some(Self::Scrape),
            "crawl" => Some(Self::Crawl),
            "search" => Some(Self::Search),
            "extract" => Some(Self::Extract),
            _ => None,
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes the cache key for a (kind, identifier) pair
///
/// Hex-encoded SHA-256 of `"{kind}:{identifier}"`.
pub fn cache_key(kind: CacheKind, identifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(identifier.as_bytes());
    hex::encode(hasher.finalize())
}

/// Represents a cached row
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub identifier: String,
    pub content_type: String,
    pub content_hash: String,
    /// Serialized JSON payload
    pub content: String,
    /// Serialized JSON metadata
    pub metadata: Option<String>,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Represents one row of the activity log
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRecord {
    pub id: Option<i64>,
    pub action_type: String,
    pub identifiers: Vec<String>,
    pub actor: Option<String>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Formats a timestamp so that string order matches time order
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(s: &str) -> CacheResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CacheError::Serialization(format!("Bad timestamp '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cache_kind_roundtrip() {
        for kind in [
            CacheKind::Scrape,
            CacheKind::Crawl,
            CacheKind::Search,
            CacheKind::Extract,
        ] {
            assert_eq!(CacheKind::from_db_string(kind.as_str()), Some(kind));
        }
        assert_eq!(CacheKind::from_db_string("invalid"), None);
    }

    #[test]
    fn test_cache_key_is_stable_and_distinct() {
        let a = cache_key(CacheKind::Scrape, "https://example.com/");
        let b = cache_key(CacheKind::Scrape, "https://example.com/");
        let c = cache_key(CacheKind::Extract, "https://example.com/");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_timestamp_format_sorts_lexically() {
        let whole = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let later = whole + chrono::Duration::milliseconds(5);

        let a = format_timestamp(whole);
        let b = format_timestamp(later);

        assert_eq!(a, "2026-03-01T12:00:00.000Z");
        assert!(a < b);
        assert_eq!(parse_timestamp(&b).unwrap(), later);
    }
}
