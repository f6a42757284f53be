//! Clinic-Scout: research and scraping back end for a clinic website
//!
//! This crate orchestrates calls to a hosted scraping API (scrape, crawl,
//! search, structured extraction), guarded by an in-process rate limiter and a
//! SQLite content cache. On top of that it provides RSS monitoring with
//! filters and a review pass for medical marketing copy.

pub mod cache;
pub mod config;
pub mod extract;
pub mod firecrawl;
pub mod output;
pub mod ratelimit;
pub mod research;
pub mod review;
pub mod rss;
pub mod url;

use thiserror::Error;

/// Main error type for Clinic-Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Firecrawl API key is not configured")]
    MissingApiKey,

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Firecrawl API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected response from {endpoint}: {message}")]
    Parse { endpoint: String, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("Feed parse error: {0}")]
    Feed(String),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Clinic-Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, ConfigUpdate};
pub use ratelimit::RateLimiter;
pub use research::ResearchService;
pub use crate::url::{normalize_url, validate_target_url};
