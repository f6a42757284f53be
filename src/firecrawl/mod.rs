//! Client for the hosted scraping provider
//!
//! This module handles:
//! - Building the HTTP client
//! - Bearer authentication and rate limiting of every call
//! - Mapping non-2xx statuses, bad JSON and `success: false` bodies to errors
//! - Typed request and response bodies per endpoint

mod client;
pub mod types;

pub use client::{build_http_client, FirecrawlClient};
pub use types::{
    Action, CrawlRequestBody, CrawlStartResponse, CrawlStatusResponse, ExtractRequestBody,
    NestedScrapeOptions, PageMetadata, ScrapeData, ScrapeFormat, ScrapeRequestBody,
    ScrollDirection, SearchHitData, SearchRequestBody,
};
