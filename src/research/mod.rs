//! Research orchestrator
//!
//! [`ResearchService`] exposes scrape, crawl, search, extraction, feed
//! monitoring and medical-page parsing on top of the provider client, the
//! rate limiter, the content cache and the extraction templates.

mod service;
mod types;

pub use service::ResearchService;
pub use types::{
    CrawlJob, CrawlRequest, CrawlStatus, ExtractRequest, ExtractionResult, HealthStatus,
    MedicalParseRequest, MedicalParseResult, RssMonitorRequest, RssMonitorResult,
    ScrapeRequest, ScrapeResult, SearchRequest, SearchResponse, SearchResult, TimeRange,
};
