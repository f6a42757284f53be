//! Request and result shapes of the research operations
//!
//! Every result carries its own success flag or error so that callers never
//! have to handle an `Err` for an external failure.

use crate::cache::CacheStats;
use crate::config::RateLimitSettings;
use crate::extract::{Confidence, ExtractionType};
use crate::firecrawl::{Action, PageMetadata, ScrapeData, ScrapeFormat, SearchHitData};
use crate::ratelimit::RateLimitUsage;
use crate::review::ContentReview;
use crate::rss::{RssFeedItem, RssFilters};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ===== Scrape =====

#[derive(Debug, Clone, Default)]
pub struct ScrapeRequest {
    pub url: String,
    /// Empty means markdown only
    pub formats: Vec<ScrapeFormat>,
    pub only_main_content: Option<bool>,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub headers: HashMap<String, String>,
    /// Delay before capture, for pages that render client-side
    pub wait_for_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub actions: Vec<Action>,
    /// Bypass the cache read; the fresh result is still stored
    pub skip_cache: bool,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_formats(mut self, formats: Vec<ScrapeFormat>) -> Self {
        self.formats = formats;
        self
    }

    pub(crate) fn effective_formats(&self) -> Vec<ScrapeFormat> {
        if self.formats.is_empty() {
            vec![ScrapeFormat::Markdown]
        } else {
            let mut formats = self.formats.clone();
            formats.dedup();
            formats
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub from_cache: bool,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapeResult {
    pub fn failure(url: &str, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            markdown: None,
            html: None,
            raw_html: None,
            links: Vec::new(),
            screenshot: None,
            metadata: None,
            error: Some(error.into()),
            from_cache: false,
            scraped_at: Utc::now(),
        }
    }

    /// Normalizes a provider document; `url` is used when it has no source URL
    pub fn from_data(url: &str, data: ScrapeData) -> Self {
        let page_error = data.metadata.as_ref().and_then(|m| m.error.clone());
        let source = data
            .metadata
            .as_ref()
            .and_then(|m| m.source_url.clone())
            .unwrap_or_else(|| url.to_string());

        Self {
            url: source,
            success: page_error.is_none(),
            markdown: data.markdown,
            html: data.html,
            raw_html: data.raw_html,
            links: data.links.unwrap_or_default(),
            screenshot: data.screenshot,
            metadata: data.metadata,
            error: page_error,
            from_cache: false,
            scraped_at: Utc::now(),
        }
    }
}

// ===== Crawl =====

#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub url: String,
    pub max_depth: u32,
    pub limit: u32,
    /// Regex patterns of paths to include
    pub include_paths: Vec<String>,
    /// Regex patterns of paths to skip
    pub exclude_paths: Vec<String>,
    /// Formats scraped for every page; empty means markdown
    pub formats: Vec<ScrapeFormat>,
}

impl CrawlRequest {
    pub const DEFAULT_MAX_DEPTH: u32 = 2;
    pub const DEFAULT_LIMIT: u32 = 100;

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_depth: Self::DEFAULT_MAX_DEPTH,
            limit: Self::DEFAULT_LIMIT,
            include_paths: Vec::new(),
            exclude_paths: Vec::new(),
            formats: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl CrawlStatus {
    /// Maps the provider's job status vocabulary
    pub fn from_provider(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "scraping" | "active" | "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" | "cancelled" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// Local view of a provider crawl job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJob {
    /// Provider job id; absent when the job never started
    pub id: Option<String>,
    pub url: Option<String>,
    pub status: CrawlStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ScrapeResult>,
    pub total_pages: u32,
    pub completed_pages: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub from_cache: bool,
}

impl CrawlJob {
    pub fn failed(id: Option<String>, url: Option<String>, error: impl Into<String>) -> Self {
        Self {
            id,
            url,
            status: CrawlStatus::Failed,
            results: Vec::new(),
            total_pages: 0,
            completed_pages: 0,
            started_at: None,
            completed_at: None,
            error: Some(error.into()),
            from_cache: false,
        }
    }
}

// ===== Search =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
    #[default]
    All,
}

impl TimeRange {
    /// Provider `tbs` value; `None` searches all time
    pub fn tbs(&self) -> Option<&'static str> {
        match self {
            Self::Day => Some("qdr:d"),
            Self::Week => Some("qdr:w"),
            Self::Month => Some("qdr:m"),
            Self::Year => Some("qdr:y"),
            Self::All => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    /// Defaults to 10
    pub limit: Option<u32>,
    pub time_range: TimeRange,
    /// Also scrape every hit inline
    pub scrape_results: bool,
    /// Formats for inline scraping; empty means markdown
    pub formats: Vec<ScrapeFormat>,
    pub lang: Option<String>,
    pub country: Option<String>,
    pub skip_cache: bool,
}

impl SearchRequest {
    pub const DEFAULT_LIMIT: u32 = 10;

    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,
}

impl From<SearchHitData> for SearchResult {
    fn from(hit: SearchHitData) -> Self {
        let title = hit
            .title
            .or_else(|| hit.metadata.as_ref().and_then(|m| m.title.clone()));
        let description = hit
            .description
            .or_else(|| hit.metadata.as_ref().and_then(|m| m.description.clone()));

        Self {
            url: hit.url,
            title,
            description,
            markdown: hit.markdown,
            html: hit.html,
            links: hit.links.unwrap_or_default(),
            metadata: hit.metadata,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub success: bool,
    pub results: Vec<SearchResult>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub from_cache: bool,
}

impl SearchResponse {
    pub fn failure(query: &str, error: impl Into<String>) -> Self {
        Self {
            query: query.to_string(),
            success: false,
            results: Vec::new(),
            total: 0,
            error: Some(error.into()),
            from_cache: false,
        }
    }
}

// ===== Extract =====

#[derive(Debug, Clone, Default)]
pub struct ExtractRequest {
    pub urls: Vec<String>,
    /// Merged over the detected template's schema
    pub schema: Option<Value>,
    /// Appended to the detected template's prompt
    pub prompt: Option<String>,
    /// Forces a template instead of detecting one per URL
    pub extraction_type: Option<ExtractionType>,
    pub skip_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub url: String,
    pub extraction_type: ExtractionType,
    pub extracted_data: Option<Value>,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub from_cache: bool,
    pub extracted_at: DateTime<Utc>,
}

impl ExtractionResult {
    pub fn failure(url: &str, extraction_type: ExtractionType, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            extraction_type,
            extracted_data: None,
            confidence: Confidence::Low,
            error: Some(error.into()),
            from_cache: false,
            extracted_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.extracted_data.is_some()
    }
}

// ===== RSS =====

#[derive(Debug, Clone, Default)]
pub struct RssMonitorRequest {
    pub feed_url: String,
    pub filters: RssFilters,
    /// Scrape each item's link and attach its markdown
    pub include_full_content: bool,
    /// Items kept from the top of the feed; defaults to 20
    pub max_items: Option<usize>,
}

impl RssMonitorRequest {
    pub const DEFAULT_MAX_ITEMS: usize = 20;

    pub fn new(feed_url: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RssMonitorResult {
    pub feed_url: String,
    pub success: bool,
    pub items: Vec<RssFeedItem>,
    /// Items in the feed before capping and filtering
    pub total_items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl RssMonitorResult {
    pub fn failure(feed_url: &str, error: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.to_string(),
            success: false,
            items: Vec::new(),
            total_items: 0,
            error: Some(error.into()),
            checked_at: Utc::now(),
        }
    }
}

// ===== Medical =====

#[derive(Debug, Clone, Default)]
pub struct MedicalParseRequest {
    pub url: String,
    pub extraction_type: Option<ExtractionType>,
    pub schema: Option<Value>,
    pub prompt: Option<String>,
}

impl MedicalParseRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalParseResult {
    pub url: String,
    pub success: bool,
    pub scrape: ScrapeResult,
    pub extraction: Option<ExtractionResult>,
    pub review: Option<ContentReview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ===== Health =====

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub api_key_configured: bool,
    pub base_url: String,
    /// `None` when no cache store is open
    pub cache: Option<CacheStats>,
    pub rate_limit: RateLimitUsage,
    pub limits: RateLimitSettings,
}
