//! Integration tests for the research service
//!
//! A wiremock server stands in for the scraping provider so every operation
//! runs end-to-end through the HTTP client, rate limiter and cache.

mod common;
mod crawl_tests;
mod extract_tests;
mod feed_tests;
mod scrape_tests;
