//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Clinic-Scout database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Cached provider responses, keyed by a hash of kind + identifier
CREATE TABLE IF NOT EXISTS cached_content (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    identifier TEXT NOT NULL,
    content_type TEXT NOT NULL,
    content_hash TEXT NOT NULL UNIQUE,
    content TEXT NOT NULL,
    metadata TEXT,
    cached_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cached_content_expires ON cached_content(expires_at);
CREATE INDEX IF NOT EXISTS idx_cached_content_type ON cached_content(content_type);

-- Research activity history
CREATE TABLE IF NOT EXISTS activity_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    action_type TEXT NOT NULL,
    identifiers TEXT NOT NULL,
    actor TEXT,
    details TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_activity_log_created ON activity_log(created_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
