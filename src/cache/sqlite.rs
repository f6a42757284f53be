//! SQLite cache store implementation
//!
//! This module provides a SQLite-based implementation of the CacheStore trait.

use crate::cache::schema::initialize_schema;
use crate::cache::traits::{CacheError, CacheResult, CacheStore};
use crate::cache::{format_timestamp, parse_timestamp, ActivityRecord, CacheEntry};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite cache backend
pub struct SqliteCacheStore {
    conn: Connection,
}

impl SqliteCacheStore {
    /// Opens (or creates) a cache database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteCacheStore)` - Successfully opened/created database
    /// * `Err(CacheError)` - Failed to open database
    pub fn new(path: &Path) -> CacheResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    ///
    /// Used by tests and by callers that want a process-local cache.
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Row shape before timestamp parsing
struct RawEntry {
    identifier: String,
    content_type: String,
    content_hash: String,
    content: String,
    metadata: Option<String>,
    cached_at: String,
    expires_at: String,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            identifier: row.get(0)?,
            content_type: row.get(1)?,
            content_hash: row.get(2)?,
            content: row.get(3)?,
            metadata: row.get(4)?,
            cached_at: row.get(5)?,
            expires_at: row.get(6)?,
        })
    }

    fn into_entry(self) -> CacheResult<CacheEntry> {
        Ok(CacheEntry {
            identifier: self.identifier,
            content_type: self.content_type,
            content_hash: self.content_hash,
            content: self.content,
            metadata: self.metadata,
            cached_at: parse_timestamp(&self.cached_at)?,
            expires_at: parse_timestamp(&self.expires_at)?,
        })
    }
}

impl CacheStore for SqliteCacheStore {
    // ===== Cached Content =====

    fn get_entry(&self, hash: &str, now: DateTime<Utc>) -> CacheResult<Option<CacheEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT identifier, content_type, content_hash, content, metadata, cached_at, expires_at
             FROM cached_content WHERE content_hash = ?1 AND expires_at > ?2",
        )?;

        let row = stmt
            .query_row(params![hash, format_timestamp(now)], RawEntry::from_row)
            .optional()?;

        row.map(RawEntry::into_entry).transpose()
    }

    fn upsert_entry(&mut self, entry: &CacheEntry) -> CacheResult<()> {
        self.conn.execute(
            "INSERT INTO cached_content
             (identifier, content_type, content_hash, content, metadata, cached_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(content_hash) DO UPDATE SET
                identifier = excluded.identifier,
                content_type = excluded.content_type,
                content = excluded.content,
                metadata = excluded.metadata,
                cached_at = excluded.cached_at,
                expires_at = excluded.expires_at",
            params![
                entry.identifier,
                entry.content_type,
                entry.content_hash,
                entry.content,
                entry.metadata,
                format_timestamp(entry.cached_at),
                format_timestamp(entry.expires_at),
            ],
        )?;
        Ok(())
    }

    fn delete_expired(&mut self, now: DateTime<Utc>) -> CacheResult<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM cached_content WHERE expires_at <= ?1",
            params![format_timestamp(now)],
        )?;
        Ok(deleted)
    }

    fn delete_all(&mut self) -> CacheResult<usize> {
        let deleted = self.conn.execute("DELETE FROM cached_content", [])?;
        Ok(deleted)
    }

    fn count_entries(&self, now: DateTime<Utc>) -> CacheResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cached_content WHERE expires_at > ?1",
            params![format_timestamp(now)],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Activity Log =====

    fn log_activity(&mut self, record: &ActivityRecord) -> CacheResult<i64> {
        let identifiers = serde_json::to_string(&record.identifiers)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        let details = serde_json::to_string(&record.details)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        self.conn.execute(
            "INSERT INTO activity_log (action_type, identifiers, actor, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.action_type,
                identifiers,
                record.actor,
                details,
                format_timestamp(record.created_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn recent_activity(&self, limit: usize) -> CacheResult<Vec<ActivityRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, action_type, identifiers, actor, details, created_at
             FROM activity_log ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, action_type, identifiers, actor, details, created_at) = row?;
            records.push(ActivityRecord {
                id: Some(id),
                action_type,
                identifiers: serde_json::from_str(&identifiers)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?,
                actor,
                details: serde_json::from_str(&details)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?,
                created_at: parse_timestamp(&created_at)?,
            });
        }

        Ok(records)
    }
}
