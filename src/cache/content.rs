use crate::cache::traits::CacheStore;
use crate::cache::{cache_key, ActivityRecord, CacheEntry, CacheKind};
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

/// Snapshot of cache settings and size
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub ttl_seconds: i64,
    pub live_entries: u64,
}

/// Longest freshness window the cache will apply, one year
pub const MAX_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy)]
struct CacheSettings {
    enabled: bool,
    ttl: Duration,
}

/// Best-effort cache in front of a [`CacheStore`]
///
/// Reads only return rows that have not expired. Store failures are logged
/// and then treated as a miss (reads) or ignored (writes), so caching never
/// fails the operation it sits in front of.
pub struct ContentCache {
    store: Mutex<Box<dyn CacheStore>>,
    settings: Mutex<CacheSettings>,
}

impl ContentCache {
    /// Wraps a store with the given freshness window
    pub fn new(store: Box<dyn CacheStore>, enabled: bool, ttl_seconds: u64) -> Self {
        Self {
            store: Mutex::new(store),
            settings: Mutex::new(CacheSettings {
                enabled,
                ttl: ttl_duration(ttl_seconds),
            }),
        }
    }

    fn lock_store(&self) -> MutexGuard<'_, Box<dyn CacheStore>> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn settings(&self) -> CacheSettings {
        *self
            .settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Updates the on/off switch and freshness window
    pub fn configure(&self, enabled: bool, ttl_seconds: u64) {
        let mut settings = self
            .settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        settings.enabled = enabled;
        settings.ttl = ttl_duration(ttl_seconds);
    }

    pub fn is_enabled(&self) -> bool {
        self.settings().enabled
    }

    /// Gets the payload cached for `(kind, identifier)`, if still fresh
    pub fn get(&self, kind: CacheKind, identifier: &str) -> Option<Value> {
        self.get_at(kind, identifier, Utc::now())
    }

    /// Same as [`get`](Self::get) with an explicit clock
    pub fn get_at(&self, kind: CacheKind, identifier: &str, now: DateTime<Utc>) -> Option<Value> {
        if !self.is_enabled() {
            return None;
        }

        let hash = cache_key(kind, identifier);
        let entry = match self.lock_store().get_entry(&hash, now) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tracing::debug!("Cache miss for {} {}", kind, identifier);
                return None;
            }
            Err(e) => {
                tracing::warn!("Cache read failed for {} {}: {}", kind, identifier, e);
                return None;
            }
        };

        match serde_json::from_str(&entry.content) {
            Ok(value) => {
                tracing::debug!("Cache hit for {} {}", kind, identifier);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("Discarding unreadable cache row for {}: {}", identifier, e);
                None
            }
        }
    }

    /// Gets a cached payload and decodes it into `T`
    pub fn get_as<T: DeserializeOwned>(&self, kind: CacheKind, identifier: &str) -> Option<T> {
        let value = self.get(kind, identifier)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("Cached {} for {} has unexpected shape: {}", kind, identifier, e);
                None
            }
        }
    }

    /// Stores `payload` for `(kind, identifier)` until now + TTL
    pub fn put(&self, kind: CacheKind, identifier: &str, payload: &Value, metadata: Option<&Value>) {
        self.put_at(kind, identifier, payload, metadata, Utc::now());
    }

    /// Same as [`put`](Self::put) with an explicit clock
    pub fn put_at(
        &self,
        kind: CacheKind,
        identifier: &str,
        payload: &Value,
        metadata: Option<&Value>,
        now: DateTime<Utc>,
    ) {
        let settings = self.settings();
        if !settings.enabled {
            return;
        }

        let content = match serde_json::to_string(payload) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Could not serialize {} for cache: {}", identifier, e);
                return;
            }
        };

        let Some(expires_at) = now.checked_add_signed(settings.ttl) else {
            tracing::warn!("Expiry out of range for {} {}, not caching", kind, identifier);
            return;
        };

        let entry = CacheEntry {
            identifier: identifier.to_string(),
            content_type: kind.as_str().to_string(),
            content_hash: cache_key(kind, identifier),
            content,
            metadata: metadata.map(|m| m.to_string()),
            cached_at: now,
            expires_at,
        };

        if let Err(e) = self.lock_store().upsert_entry(&entry) {
            tracing::warn!("Cache write failed for {} {}: {}", kind, identifier, e);
        }
    }

    /// Serializes `payload` and stores it
    pub fn put_as<T: Serialize>(&self, kind: CacheKind, identifier: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(value) => self.put(kind, identifier, &value, None),
            Err(e) => tracing::warn!("Could not serialize {} for cache: {}", identifier, e),
        }
    }

    /// Deletes expired rows, returning how many were removed
    pub fn clear_expired(&self) -> usize {
        match self.lock_store().delete_expired(Utc::now()) {
            Ok(deleted) => {
                tracing::info!("Cleared {} expired cache entries", deleted);
                deleted
            }
            Err(e) => {
                tracing::warn!("Failed to clear expired cache entries: {}", e);
                0
            }
        }
    }

    /// Deletes every cached row, returning how many were removed
    pub fn clear_all(&self) -> usize {
        match self.lock_store().delete_all() {
            Ok(deleted) => {
                tracing::info!("Purged {} cache entries", deleted);
                deleted
            }
            Err(e) => {
                tracing::warn!("Failed to purge cache: {}", e);
                0
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let settings = self.settings();
        let live_entries = self
            .lock_store()
            .count_entries(Utc::now())
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to count cache entries: {}", e);
                0
            });

        CacheStats {
            enabled: settings.enabled,
            ttl_seconds: settings.ttl.num_seconds(),
            live_entries,
        }
    }

    /// Appends an activity-log row; failures are logged and ignored
    pub fn record_activity(
        &self,
        action_type: &str,
        identifiers: &[String],
        actor: Option<&str>,
        details: Value,
    ) {
        let record = ActivityRecord {
            id: None,
            action_type: action_type.to_string(),
            identifiers: identifiers.to_vec(),
            actor: actor.map(str::to_string),
            details,
            created_at: Utc::now(),
        };

        if let Err(e) = self.lock_store().log_activity(&record) {
            tracing::warn!("Failed to record {} activity: {}", action_type, e);
        }
    }

    /// Most recent activity rows, newest first
    pub fn recent_activity(&self, limit: usize) -> Vec<ActivityRecord> {
        self.lock_store()
            .recent_activity(limit)
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to read activity log: {}", e);
                Vec::new()
            })
    }
}

/// Freshness window for `ttl_seconds`, capped at [`MAX_TTL_SECONDS`]
fn ttl_duration(ttl_seconds: u64) -> Duration {
    if ttl_seconds > MAX_TTL_SECONDS {
        tracing::warn!(
            "Cache TTL of {}s capped at {}s",
            ttl_seconds,
            MAX_TTL_SECONDS
        );
    }
    // Fits in i64 once capped
    Duration::seconds(ttl_seconds.min(MAX_TTL_SECONDS) as i64)
}
