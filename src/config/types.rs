use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev/v1";

/// Main configuration structure for Clinic-Scout
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub firecrawl: FirecrawlConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default, rename = "rate-limit")]
    pub rate_limit: RateLimitSettings,
}

/// Scraping provider connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct FirecrawlConfig {
    /// Bearer token for the provider (overridden by `FIRECRAWL_API_KEY`)
    #[serde(default, rename = "api-key")]
    pub api_key: Option<String>,

    /// Base URL all endpoint paths are appended to
    #[serde(default = "default_base_url", rename = "base-url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_secs", rename = "timeout-secs")]
    pub timeout_secs: u64,
}

/// Content cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Whether results are cached at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Freshness window for cached rows (seconds)
    #[serde(default = "default_ttl_seconds", rename = "ttl-seconds")]
    pub ttl_seconds: u64,

    /// Path to the SQLite database file
    #[serde(default = "default_database_path", rename = "database-path")]
    pub database_path: String,
}

/// Outbound request ceilings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_per_minute", rename = "per-minute")]
    pub per_minute: u32,

    #[serde(default = "default_per_hour", rename = "per-hour")]
    pub per_hour: u32,

    #[serde(default = "default_per_day", rename = "per-day")]
    pub per_day: u32,

    /// Requests tolerated within one second once a ceiling is reached
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Longest single sleep while waiting for a free slot (milliseconds)
    #[serde(default = "default_cooldown_ms", rename = "cooldown-ms")]
    pub cooldown_ms: u64,
}

/// Runtime overrides applied through `ResearchService::configure`
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub api_key: Option<String>,
    pub cache_enabled: Option<bool>,
    pub cache_ttl_seconds: Option<u64>,
    pub per_minute: Option<u32>,
    pub per_hour: Option<u32>,
    pub per_day: Option<u32>,
    pub burst: Option<u32>,
    pub cooldown_ms: Option<u64>,
}

impl ConfigUpdate {
    /// Returns a copy of `config` with this update applied
    pub fn apply_to(&self, config: &Config) -> Config {
        let mut next = config.clone();

        if let Some(key) = &self.api_key {
            next.firecrawl.api_key = Some(key.clone());
        }
        if let Some(enabled) = self.cache_enabled {
            next.cache.enabled = enabled;
        }
        if let Some(ttl) = self.cache_ttl_seconds {
            next.cache.ttl_seconds = ttl;
        }

        let limits = &mut next.rate_limit;
        if let Some(v) = self.per_minute {
            limits.per_minute = v;
        }
        if let Some(v) = self.per_hour {
            limits.per_hour = v;
        }
        if let Some(v) = self.per_day {
            limits.per_day = v;
        }
        if let Some(v) = self.burst {
            limits.burst = v;
        }
        if let Some(v) = self.cooldown_ms {
            limits.cooldown_ms = v;
        }

        next
    }
}

impl Default for FirecrawlConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_ttl_seconds(),
            database_path: default_database_path(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            per_minute: default_per_minute(),
            per_hour: default_per_hour(),
            per_day: default_per_day(),
            burst: default_burst(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_ttl_seconds() -> u64 {
    3600
}

fn default_database_path() -> String {
    "./clinic-scout.db".to_string()
}

fn default_per_minute() -> u32 {
    20
}

fn default_per_hour() -> u32 {
    500
}

fn default_per_day() -> u32 {
    5000
}

fn default_burst() -> u32 {
    5
}

fn default_cooldown_ms() -> u64 {
    1000
}
