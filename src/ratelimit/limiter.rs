use crate::config::RateLimitSettings;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Partition used for every call to the scraping provider
pub const DEFAULT_PARTITION: &str = "firecrawl";

/// Ceilings enforced by the limiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_minute: u32,
    pub per_hour: u32,
    pub per_day: u32,
    pub burst: u32,
    /// Upper bound on a single sleep inside `wait_for_limit`
    pub cooldown: Duration,
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            per_minute: settings.per_minute,
            per_hour: settings.per_hour,
            per_day: settings.per_day,
            burst: settings.burst,
            cooldown: Duration::from_millis(settings.cooldown_ms),
        }
    }
}

impl RateLimitConfig {
    /// Raises every ceiling and the burst allowance to at least one
    pub fn normalized(self) -> Self {
        Self {
            per_minute: self.per_minute.max(1),
            per_hour: self.per_hour.max(1),
            per_day: self.per_day.max(1),
            burst: self.burst.max(1),
            cooldown: self.cooldown,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::from(&RateLimitSettings::default())
    }
}

/// Admitted-request counts for one partition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitUsage {
    pub last_second: usize,
    pub last_minute: usize,
    pub last_hour: usize,
    pub last_day: usize,
}

#[derive(Debug, Default)]
struct LimiterState {
    config: RateLimitConfig,
    partitions: HashMap<String, VecDeque<Instant>>,
}

/// Sliding-window rate limiter shared by every outbound provider call
///
/// Each partition keeps the timestamps of its admitted requests for the last
/// 24 hours. A request is denied only when one of the minute/hour/day
/// ceilings is reached *and* the one-second burst allowance is used up.
///
/// State lives in process memory and resets on restart.
#[derive(Debug, Default)]
pub struct RateLimiter {
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Creates a limiter with the given ceilings
    ///
    /// Zero ceilings are raised to one; see [`RateLimitConfig::normalized`].
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            state: Mutex::new(LimiterState {
                config: config.normalized(),
                partitions: HashMap::new(),
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LimiterState> {
        // The state stays consistent even if a holder panicked mid-check
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the ceilings currently in force
    pub fn config(&self) -> RateLimitConfig {
        self.lock_state().config.clone()
    }

    /// Replaces the ceilings; recorded history is kept
    pub fn reconfigure(&self, config: RateLimitConfig) {
        let config = config.normalized();
        tracing::info!(
            "Rate limits updated: {}/min, {}/hour, {}/day, burst {}",
            config.per_minute,
            config.per_hour,
            config.per_day,
            config.burst
        );
        self.lock_state().config = config;
    }

    /// Forgets every recorded request
    pub fn reset(&self) {
        self.lock_state().partitions.clear();
    }

    /// Checks whether one more request is permitted now, recording it if so
    pub fn check_limit(&self, key: &str) -> bool {
        self.check_limit_at(key, Instant::now())
    }

    /// Same as [`check_limit`](Self::check_limit) with an explicit clock
    pub fn check_limit_at(&self, key: &str, now: Instant) -> bool {
        self.try_acquire_at(key, now).is_ok()
    }

    /// Returns how long until a request would be admitted, or `None` if now
    ///
    /// Does not record anything.
    pub fn time_until_available_at(&self, key: &str, now: Instant) -> Option<Duration> {
        let mut state = self.lock_state();
        let config = state.config.clone();
        let history = state.partitions.entry(key.to_string()).or_default();
        prune(history, now);
        wait_needed(history, &config, now)
    }

    /// Admits a request at `now` or returns the wait until one would be
    fn try_acquire_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut state = self.lock_state();
        let config = state.config.clone();
        let history = state.partitions.entry(key.to_string()).or_default();
        prune(history, now);

        if let Some(wait) = wait_needed(history, &config, now) {
            return Err(wait);
        }

        history.push_back(now);
        Ok(())
    }

    /// Suspends until a request for `key` is admitted, then records it
    ///
    /// Sleeps for the exact time until a slot frees up, capped at the
    /// configured cooldown so that reconfiguration is picked up promptly.
    pub async fn wait_for_limit(&self, key: &str) {
        loop {
            let wait = match self.try_acquire_at(key, Instant::now()) {
                Ok(()) => return,
                Err(wait) => wait,
            };

            let cooldown = self.lock_state().config.cooldown;
            let sleep_for = wait.min(cooldown).max(Duration::from_millis(1));
            tracing::debug!("Rate limit reached for '{}', sleeping {:?}", key, sleep_for);
            tokio::time::sleep(sleep_for).await;
        }
    }

    /// Returns request counts for `key` over each window
    pub fn usage(&self, key: &str) -> RateLimitUsage {
        self.usage_at(key, Instant::now())
    }

    /// Same as [`usage`](Self::usage) with an explicit clock
    pub fn usage_at(&self, key: &str, now: Instant) -> RateLimitUsage {
        let state = self.lock_state();
        match state.partitions.get(key) {
            Some(history) => RateLimitUsage {
                last_second: count_within(history, now, SECOND),
                last_minute: count_within(history, now, MINUTE),
                last_hour: count_within(history, now, HOUR),
                last_day: count_within(history, now, DAY),
            },
            None => RateLimitUsage::default(),
        }
    }
}

/// Drops timestamps that fell out of the 24-hour window
fn prune(history: &mut VecDeque<Instant>, now: Instant) {
    history.retain(|t| now.saturating_duration_since(*t) < DAY);
}

fn count_within(history: &VecDeque<Instant>, now: Instant, window: Duration) -> usize {
    history
        .iter()
        .filter(|t| now.saturating_duration_since(**t) < window)
        .count()
}

/// Timestamps inside `window`, oldest first
fn entries_within(history: &VecDeque<Instant>, now: Instant, window: Duration) -> Vec<Instant> {
    let mut entries: Vec<Instant> = history
        .iter()
        .copied()
        .filter(|t| now.saturating_duration_since(*t) < window)
        .collect();
    entries.sort();
    entries
}

/// Time until the window holds fewer than `limit` entries
///
/// `entries` must be sorted. A zero limit never frees a slot, so the whole
/// window is returned.
fn slot_wait(entries: &[Instant], limit: u32, window: Duration, now: Instant) -> Duration {
    let idx = entries.len().saturating_sub(limit as usize);
    match entries.get(idx) {
        Some(oldest) => (*oldest + window).saturating_duration_since(now),
        None => window,
    }
}

/// `None` when a request is admissible at `now`, else the wait
fn wait_needed(
    history: &VecDeque<Instant>,
    config: &RateLimitConfig,
    now: Instant,
) -> Option<Duration> {
    let mut ceiling_wait: Option<Duration> = None;

    for (window, limit) in [
        (MINUTE, config.per_minute),
        (HOUR, config.per_hour),
        (DAY, config.per_day),
    ] {
        let entries = entries_within(history, now, window);
        if entries.len() >= limit as usize {
            let wait = slot_wait(&entries, limit, window, now);
            ceiling_wait = Some(ceiling_wait.map_or(wait, |w| w.max(wait)));
        }
    }

    let ceiling_wait = ceiling_wait?;

    let burst_entries = entries_within(history, now, SECOND);
    if burst_entries.len() < config.burst as usize {
        return None;
    }

    let burst_wait = slot_wait(&burst_entries, config.burst, SECOND, now);
    Some(burst_wait.min(ceiling_wait))
}
