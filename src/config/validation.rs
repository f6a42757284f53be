use crate::cache::MAX_TTL_SECONDS;
use crate::config::types::{CacheConfig, Config, FirecrawlConfig, RateLimitSettings};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_firecrawl_config(&config.firecrawl)?;
    validate_cache_config(&config.cache)?;
    validate_rate_limits(&config.rate_limit)?;
    Ok(())
}

/// Validates provider connection settings
fn validate_firecrawl_config(config: &FirecrawlConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if let Some(key) = &config.api_key {
        if key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "api-key cannot be blank (omit it instead)".to_string(),
            ));
        }
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates cache settings
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.ttl_seconds < 1 {
        return Err(ConfigError::Validation(
            "ttl-seconds must be >= 1".to_string(),
        ));
    }

    if config.ttl_seconds > MAX_TTL_SECONDS {
        return Err(ConfigError::Validation(format!(
            "ttl-seconds must be <= {}",
            MAX_TTL_SECONDS
        )));
    }

    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates rate limit ceilings
fn validate_rate_limits(limits: &RateLimitSettings) -> Result<(), ConfigError> {
    for (name, value) in [
        ("per-minute", limits.per_minute),
        ("per-hour", limits.per_hour),
        ("per-day", limits.per_day),
        ("burst", limits.burst),
    ] {
        if value < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got {}",
                name, value
            )));
        }
    }

    if limits.per_minute > limits.per_hour || limits.per_hour > limits.per_day {
        return Err(ConfigError::Validation(format!(
            "rate ceilings must satisfy per-minute <= per-hour <= per-day, got {} / {} / {}",
            limits.per_minute, limits.per_hour, limits.per_day
        )));
    }

    if !(10..=60_000).contains(&limits.cooldown_ms) {
        return Err(ConfigError::Validation(format!(
            "cooldown-ms must be between 10 and 60000, got {}",
            limits.cooldown_ms
        )));
    }

    Ok(())
}
