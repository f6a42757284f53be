//! Cache store traits and error types
//!
//! This module defines the trait interface for cache backends and
//! associated error types.

use crate::cache::{ActivityRecord, CacheEntry};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during cache store operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache store operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Trait for cache backend implementations
///
/// Stores are synchronous; `ContentCache` serializes access behind a mutex
/// and never holds it across an await point.
pub trait CacheStore: Send {
    // ===== Cached Content =====

    /// Gets the entry for `hash` if it has not expired at `now`
    fn get_entry(&self, hash: &str, now: DateTime<Utc>) -> CacheResult<Option<CacheEntry>>;

    /// Inserts an entry, replacing any existing row with the same hash
    fn upsert_entry(&mut self, entry: &CacheEntry) -> CacheResult<()>;

    /// Deletes rows whose expiry is at or before `now`
    ///
    /// # Returns
    ///
    /// The number of rows deleted
    fn delete_expired(&mut self, now: DateTime<Utc>) -> CacheResult<usize>;

    /// Deletes every cached row
    fn delete_all(&mut self) -> CacheResult<usize>;

    /// Counts rows that are still fresh at `now`
    fn count_entries(&self, now: DateTime<Utc>) -> CacheResult<u64>;

    // ===== Activity Log =====

    /// Appends an activity record and returns its row ID
    fn log_activity(&mut self, record: &ActivityRecord) -> CacheResult<i64>;

    /// Gets the most recent activity records, newest first
    fn recent_activity(&self, limit: usize) -> CacheResult<Vec<ActivityRecord>>;
}
