//! Outbound rate limiting
//!
//! Bounds how often the scraping provider is called. Ceilings are tracked
//! per partition key over sliding minute, hour and day windows, with a
//! one-second burst allowance.

mod limiter;

pub use limiter::{RateLimitConfig, RateLimitUsage, RateLimiter, DEFAULT_PARTITION};
