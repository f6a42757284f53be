//! Configuration module for Clinic-Scout
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! plus the runtime overrides accepted by `ResearchService::configure`.
//!
//! # Example
//!
//! ```no_run
//! use clinic_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("clinic-scout.toml")).unwrap();
//! println!("Per-minute ceiling: {}", config.rate_limit.per_minute);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CacheConfig, Config, ConfigUpdate, FirecrawlConfig, RateLimitSettings, DEFAULT_BASE_URL,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, API_KEY_ENV,
    BASE_URL_ENV,
};
pub use validation::validate;
