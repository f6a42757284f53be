use crate::cache::{open_cache_store, CacheKind, ContentCache};
use crate::config::{validate, Config, ConfigUpdate};
use crate::extract::{
    detect_extraction_type, merge_prompt, merge_schema, score_confidence, template_for,
    ExtractionType,
};
use crate::firecrawl::{
    CrawlRequestBody, CrawlStatusResponse, ExtractRequestBody, FirecrawlClient,
    NestedScrapeOptions, ScrapeFormat, ScrapeRequestBody, SearchRequestBody,
};
use crate::ratelimit::{RateLimitConfig, RateLimiter, DEFAULT_PARTITION};
use crate::research::types::*;
use crate::review::review_content;
use crate::rss::{apply_filters, parse_feed};
use crate::url::{cache_identifier, validate_target_url};
use crate::{ConfigError, Result};
use chrono::Utc;
use regex::Regex;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

const MAX_CRAWL_DEPTH: u32 = 10;
const MAX_CRAWL_LIMIT: u32 = 1000;
const MAX_SEARCH_LIMIT: u32 = 100;
/// Upper bound on `next` links followed for one completed crawl
const MAX_CRAWL_PAGES: usize = 50;

/// Entry point for every research operation
///
/// Owns the provider client, the shared rate limiter and the optional
/// content cache. Methods take `&self` and may be called concurrently; no
/// lock is held across an `.await`.
///
/// Public operations never return `Err` for provider, network or input
/// failures. Those come back as result values with `success: false` (or a
/// low-confidence empty extraction).
pub struct ResearchService {
    client: FirecrawlClient,
    limiter: Arc<RateLimiter>,
    cache: RwLock<Option<Arc<ContentCache>>>,
    config: Mutex<Config>,
    /// Who activity-log rows are attributed to
    actor: RwLock<Option<String>>,
}

impl ResearchService {
    /// Builds the service from a validated configuration
    ///
    /// Opens the SQLite cache when caching is enabled.
    pub fn new(config: &Config) -> Result<Self> {
        validate(config)?;

        let cache = if config.cache.enabled {
            Some(open_content_cache(config)?)
        } else {
            None
        };

        Self::build(config, cache)
    }

    /// Builds the service around an existing cache
    pub fn with_cache(config: &Config, cache: ContentCache) -> Result<Self> {
        validate(config)?;
        Self::build(config, Some(cache))
    }

    fn build(config: &Config, cache: Option<ContentCache>) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::from(&config.rate_limit)));
        let client = FirecrawlClient::new(
            &config.firecrawl.base_url,
            config.firecrawl.api_key.clone(),
            Duration::from_secs(config.firecrawl.timeout_secs),
            limiter.clone(),
        )?;

        Ok(Self {
            client,
            limiter,
            cache: RwLock::new(cache.map(Arc::new)),
            config: Mutex::new(config.clone()),
            actor: RwLock::new(None),
        })
    }

    /// Attributes subsequent activity-log rows to `actor`, e.g. an email
    pub fn set_actor(&self, actor: Option<String>) {
        *self
            .actor
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = actor;
    }

    fn cache(&self) -> Option<Arc<ContentCache>> {
        self.cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, action: &str, identifiers: &[String], details: Value) {
        if let Some(cache) = self.cache() {
            let actor = self
                .actor
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone();
            cache.record_activity(action, identifiers, actor.as_deref(), details);
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    // ===== Scrape =====

    /// Scrapes one URL, serving fresh cached results when available
    pub async fn scrape_url(&self, request: ScrapeRequest) -> ScrapeResult {
        tracing::info!("Scraping {}", request.url);
        let result = self.scrape_inner(&request).await;

        self.record(
            "scrape",
            &[request.url.clone()],
            json!({
                "success": result.success,
                "from_cache": result.from_cache,
                "error": result.error,
            }),
        );
        result
    }

    async fn scrape_inner(&self, request: &ScrapeRequest) -> ScrapeResult {
        let url = match validate_target_url(&request.url) {
            Ok(url) => url,
            Err(e) => return ScrapeResult::failure(&request.url, e.to_string()),
        };

        let formats = request.effective_formats();
        let identifier = format!(
            "{}|{}|{}",
            cache_identifier(url.as_str()),
            format_list(&formats),
            scrape_options_fingerprint(request)
        );
        let cache = self.cache();

        if !request.skip_cache {
            if let Some(mut cached) = cache
                .as_ref()
                .and_then(|c| c.get_as::<ScrapeResult>(CacheKind::Scrape, &identifier))
            {
                cached.from_cache = true;
                return cached;
            }
        }

        let body = ScrapeRequestBody {
            url: url.to_string(),
            formats,
            only_main_content: request.only_main_content,
            include_tags: non_empty(&request.include_tags),
            exclude_tags: non_empty(&request.exclude_tags),
            headers: (!request.headers.is_empty()).then(|| request.headers.clone()),
            wait_for: request.wait_for_ms,
            timeout: request.timeout_ms,
            actions: (!request.actions.is_empty()).then(|| request.actions.clone()),
        };

        match self.client.scrape(&body).await {
            Ok(data) => {
                let result = ScrapeResult::from_data(url.as_str(), data);
                if let Some(cache) = &cache {
                    if result.success {
                        cache.put_as(CacheKind::Scrape, &identifier, &result);
                    }
                }
                result
            }
            Err(e) => {
                tracing::error!("Scrape of {} failed: {}", url, e);
                ScrapeResult::failure(url.as_str(), e.to_string())
            }
        }
    }

    // ===== Crawl =====

    /// Starts a multi-page crawl; poll it with [`check_crawl_status`](Self::check_crawl_status)
    pub async fn crawl_website(&self, request: CrawlRequest) -> CrawlJob {
        tracing::info!(
            "Starting crawl of {} (depth {}, limit {})",
            request.url,
            request.max_depth,
            request.limit
        );

        let job = match validate_crawl_request(&request) {
            Ok(body) => match self.client.start_crawl(&body).await {
                Ok(started) => CrawlJob {
                    id: Some(started.id),
                    url: Some(body.url),
                    status: CrawlStatus::Pending,
                    results: Vec::new(),
                    total_pages: 0,
                    completed_pages: 0,
                    started_at: Some(Utc::now()),
                    completed_at: None,
                    error: None,
                    from_cache: false,
                },
                Err(e) => {
                    tracing::error!("Failed to start crawl of {}: {}", request.url, e);
                    CrawlJob::failed(None, Some(request.url.clone()), e.to_string())
                }
            },
            Err(message) => {
                tracing::warn!("Rejected crawl request for {}: {}", request.url, message);
                CrawlJob::failed(None, Some(request.url.clone()), message)
            }
        };

        self.record(
            "crawl_start",
            &[request.url.clone()],
            json!({"job_id": job.id, "status": job.status, "error": job.error}),
        );
        job
    }

    /// Re-queries a crawl job and maps it onto the local status
    pub async fn check_crawl_status(&self, job_id: &str) -> CrawlJob {
        let job_id = job_id.trim();
        let cache = self.cache();

        if let Some(mut cached) = cache
            .as_ref()
            .and_then(|c| c.get_as::<CrawlJob>(CacheKind::Crawl, job_id))
        {
            tracing::debug!("Serving completed crawl {} from cache", job_id);
            cached.from_cache = true;
            return cached;
        }

        let job = match self.fetch_crawl_status(job_id).await {
            Ok(job) => job,
            Err(e) => {
                tracing::error!("Crawl status check for {} failed: {}", job_id, e);
                CrawlJob::failed(Some(job_id.to_string()), None, e.to_string())
            }
        };

        if job.status == CrawlStatus::Completed {
            if let Some(cache) = &cache {
                cache.put_as(CacheKind::Crawl, job_id, &job);
            }
        }

        self.record(
            "crawl_status",
            &[job_id.to_string()],
            json!({"status": job.status, "pages": job.results.len(), "error": job.error}),
        );
        job
    }

    async fn fetch_crawl_status(&self, job_id: &str) -> Result<CrawlJob> {
        let response = self.client.crawl_status(job_id).await?;
        let status = CrawlStatus::from_provider(&response.status);
        tracing::info!(
            "Crawl {} is {} ({}/{})",
            job_id,
            response.status,
            response.completed,
            response.total
        );

        let mut job = CrawlJob {
            id: Some(job_id.to_string()),
            url: None,
            status,
            results: Vec::new(),
            total_pages: response.total,
            completed_pages: response.completed,
            started_at: None,
            completed_at: None,
            error: None,
            from_cache: false,
        };

        match status {
            CrawlStatus::Completed => {
                job.results = self.collect_crawl_pages(response).await?;
                job.completed_at = Some(Utc::now());
            }
            CrawlStatus::Failed => {
                job.error = Some(format!("Crawl job {}", response.status));
            }
            CrawlStatus::Pending | CrawlStatus::Processing => {}
        }

        Ok(job)
    }

    /// Gathers every page of a completed crawl, following `next` links
    async fn collect_crawl_pages(&self, first: CrawlStatusResponse) -> Result<Vec<ScrapeResult>> {
        let mut results = Vec::new();
        let mut page = first;

        for _ in 0..MAX_CRAWL_PAGES {
            results.extend(
                page.data
                    .into_iter()
                    .map(|data| ScrapeResult::from_data("", data)),
            );

            match page.next.take() {
                Some(next) => page = self.client.crawl_status_next(&next).await?,
                None => return Ok(results),
            }
        }

        tracing::warn!(
            "Stopped following crawl pages after {} requests",
            MAX_CRAWL_PAGES
        );
        Ok(results)
    }

    // ===== Search =====

    /// Runs a web search, optionally scraping each hit inline
    pub async fn search_web(&self, request: SearchRequest) -> SearchResponse {
        tracing::info!("Searching for '{}'", request.query);
        let response = self.search_inner(&request).await;

        self.record(
            "search",
            &[request.query.clone()],
            json!({
                "success": response.success,
                "total": response.total,
                "from_cache": response.from_cache,
                "error": response.error,
            }),
        );
        response
    }

    async fn search_inner(&self, request: &SearchRequest) -> SearchResponse {
        let query = request.query.trim();
        if query.is_empty() {
            return SearchResponse::failure(query, "Search query cannot be empty");
        }

        let limit = request
            .limit
            .unwrap_or(SearchRequest::DEFAULT_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);
        let scrape_options = request.scrape_results.then(|| NestedScrapeOptions {
            formats: if request.formats.is_empty() {
                vec![ScrapeFormat::Markdown]
            } else {
                request.formats.clone()
            },
            only_main_content: None,
        });

        let identifier = format!(
            "{}|{}|{}|{}|{}|{}",
            query,
            limit,
            request.time_range.tbs().unwrap_or("all"),
            scrape_options
                .as_ref()
                .map(|o| format_list(&o.formats))
                .unwrap_or_default(),
            request.lang.as_deref().unwrap_or(""),
            request.country.as_deref().unwrap_or("")
        );
        let cache = self.cache();

        if !request.skip_cache {
            if let Some(mut cached) = cache
                .as_ref()
                .and_then(|c| c.get_as::<SearchResponse>(CacheKind::Search, &identifier))
            {
                cached.from_cache = true;
                return cached;
            }
        }

        let body = SearchRequestBody {
            query: query.to_string(),
            limit,
            tbs: request.time_range.tbs().map(str::to_string),
            lang: request.lang.clone(),
            country: request.country.clone(),
            scrape_options,
        };

        match self.client.search(&body).await {
            Ok(hits) => {
                let results: Vec<SearchResult> = hits.into_iter().map(SearchResult::from).collect();
                let response = SearchResponse {
                    query: query.to_string(),
                    success: true,
                    total: results.len(),
                    results,
                    error: None,
                    from_cache: false,
                };
                if let Some(cache) = &cache {
                    cache.put_as(CacheKind::Search, &identifier, &response);
                }
                response
            }
            Err(e) => {
                tracing::error!("Search for '{}' failed: {}", query, e);
                SearchResponse::failure(query, e.to_string())
            }
        }
    }

    // ===== Extract =====

    /// Extracts structured data from each URL, in order
    ///
    /// URLs are processed one at a time. A failing URL yields an entry with
    /// no data and low confidence; the rest of the batch still runs.
    pub async fn extract_content(&self, request: ExtractRequest) -> Vec<ExtractionResult> {
        tracing::info!("Extracting structured data from {} URLs", request.urls.len());
        let mut results = Vec::with_capacity(request.urls.len());

        for url in &request.urls {
            let kind = request
                .extraction_type
                .unwrap_or_else(|| detect_extraction_type(url));
            let result = self
                .extract_one(
                    url,
                    kind,
                    request.schema.as_ref(),
                    request.prompt.as_deref(),
                    request.skip_cache,
                )
                .await;
            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        self.record(
            "extract",
            &request.urls,
            json!({"requested": request.urls.len(), "succeeded": succeeded}),
        );
        results
    }

    async fn extract_one(
        &self,
        url: &str,
        kind: ExtractionType,
        schema: Option<&Value>,
        prompt: Option<&str>,
        skip_cache: bool,
    ) -> ExtractionResult {
        let target = match validate_target_url(url) {
            Ok(target) => target,
            Err(e) => return ExtractionResult::failure(url, kind, e.to_string()),
        };

        let template = template_for(kind);
        let schema = merge_schema(template, schema);
        let prompt = merge_prompt(template, prompt);
        let identifier = format!(
            "{}|{}|{}",
            cache_identifier(target.as_str()),
            kind,
            fingerprint(&[schema.to_string().as_str(), prompt.as_str()])
        );
        let cache = self.cache();

        if !skip_cache {
            if let Some(mut cached) = cache
                .as_ref()
                .and_then(|c| c.get_as::<ExtractionResult>(CacheKind::Extract, &identifier))
            {
                cached.from_cache = true;
                return cached;
            }
        }

        tracing::debug!("Extracting {} with the {} template", target, kind);
        let body = ExtractRequestBody {
            urls: vec![target.to_string()],
            prompt: Some(prompt),
            schema: Some(schema),
        };

        match self.client.extract(&body).await {
            Ok(Value::Null) => {
                tracing::warn!("Extraction of {} returned no data", target);
                ExtractionResult::failure(url, kind, "Provider returned no data")
            }
            Ok(data) => {
                let result = ExtractionResult {
                    url: url.to_string(),
                    extraction_type: kind,
                    confidence: score_confidence(&data),
                    extracted_data: Some(data),
                    error: None,
                    from_cache: false,
                    extracted_at: Utc::now(),
                };
                if let Some(cache) = &cache {
                    cache.put_as(CacheKind::Extract, &identifier, &result);
                }
                result
            }
            Err(e) => {
                tracing::error!("Extraction of {} failed: {}", target, e);
                ExtractionResult::failure(url, kind, e.to_string())
            }
        }
    }

    // ===== RSS =====

    /// Fetches, parses and filters a feed
    pub async fn monitor_rss_feed(&self, request: RssMonitorRequest) -> RssMonitorResult {
        tracing::info!("Checking feed {}", request.feed_url);
        let result = self.monitor_inner(&request).await;

        self.record(
            "rss",
            &[request.feed_url.clone()],
            json!({
                "success": result.success,
                "total_items": result.total_items,
                "matched": result.items.len(),
                "error": result.error,
            }),
        );
        result
    }

    async fn monitor_inner(&self, request: &RssMonitorRequest) -> RssMonitorResult {
        let feed_request = ScrapeRequest {
            skip_cache: true,
            ..ScrapeRequest::new(request.feed_url.clone()).with_formats(vec![ScrapeFormat::RawHtml])
        };
        let feed = self.scrape_inner(&feed_request).await;

        if !feed.success {
            return RssMonitorResult::failure(
                &request.feed_url,
                feed.error.unwrap_or_else(|| "Feed could not be fetched".to_string()),
            );
        }

        let Some(xml) = feed.raw_html.or(feed.html) else {
            return RssMonitorResult::failure(&request.feed_url, "Feed response had no content");
        };

        let mut items = match parse_feed(&xml) {
            Ok(items) => items,
            Err(e) => {
                tracing::error!("Could not parse feed {}: {}", request.feed_url, e);
                return RssMonitorResult::failure(&request.feed_url, e.to_string());
            }
        };

        let total_items = items.len();
        items.truncate(
            request
                .max_items
                .unwrap_or(RssMonitorRequest::DEFAULT_MAX_ITEMS),
        );

        if request.include_full_content {
            for item in items.iter_mut().filter(|i| !i.link.is_empty()) {
                let article = self.scrape_inner(&ScrapeRequest::new(item.link.clone())).await;
                if article.success {
                    item.full_content = article.markdown;
                } else {
                    tracing::warn!(
                        "Could not fetch full content for {}: {}",
                        item.link,
                        article.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }

        let items = apply_filters(items, &request.filters);
        tracing::info!(
            "Feed {}: {} of {} items matched",
            request.feed_url,
            items.len(),
            total_items
        );

        RssMonitorResult {
            feed_url: request.feed_url.clone(),
            success: true,
            items,
            total_items,
            error: None,
            checked_at: Utc::now(),
        }
    }

    // ===== Medical =====

    /// Scrape + template extraction + content review for one page
    pub async fn parse_medical_website(&self, request: MedicalParseRequest) -> MedicalParseResult {
        tracing::info!("Parsing medical page {}", request.url);

        let scrape = self.scrape_inner(&ScrapeRequest::new(request.url.clone())).await;
        let result = if !scrape.success {
            MedicalParseResult {
                url: request.url.clone(),
                success: false,
                error: scrape.error.clone(),
                scrape,
                extraction: None,
                review: None,
            }
        } else {
            let kind = request
                .extraction_type
                .unwrap_or_else(|| detect_extraction_type(&request.url));
            let extraction = self
                .extract_one(
                    &request.url,
                    kind,
                    request.schema.as_ref(),
                    request.prompt.as_deref(),
                    false,
                )
                .await;
            let review = review_content(scrape.markdown.as_deref().unwrap_or(""));

            MedicalParseResult {
                url: request.url.clone(),
                success: true,
                scrape,
                extraction: Some(extraction),
                review: Some(review),
                error: None,
            }
        };

        self.record(
            "medical_parse",
            &[request.url.clone()],
            json!({
                "success": result.success,
                "confidence": result.extraction.as_ref().map(|e| e.confidence),
                "warnings": result.review.as_ref().map(|r| r.warnings.len()),
            }),
        );
        result
    }

    // ===== Administration =====

    /// Applies runtime overrides
    ///
    /// The merged configuration is validated first; on error nothing changes.
    pub fn configure(&self, update: ConfigUpdate) -> std::result::Result<(), ConfigError> {
        let mut config = self
            .config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = update.apply_to(&config);
        validate(&next)?;

        if update.api_key.is_some() {
            self.client.set_api_key(next.firecrawl.api_key.clone());
        }
        self.limiter
            .reconfigure(RateLimitConfig::from(&next.rate_limit));

        match self.cache() {
            Some(cache) => cache.configure(next.cache.enabled, next.cache.ttl_seconds),
            None if next.cache.enabled => match open_content_cache(&next) {
                Ok(cache) => {
                    *self
                        .cache
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::new(cache));
                }
                Err(e) => tracing::warn!("Cache stays off, store could not be opened: {}", e),
            },
            None => {}
        }

        tracing::info!("Research service reconfigured");
        *config = next;
        Ok(())
    }

    /// Deletes expired cache rows
    pub fn clear_cache(&self) -> usize {
        self.cache().map_or(0, |c| c.clear_expired())
    }

    /// Deletes every cache row
    pub fn purge_cache(&self) -> usize {
        self.cache().map_or(0, |c| c.clear_all())
    }

    /// Most recent activity-log rows, newest first
    pub fn recent_activity(&self, limit: usize) -> Vec<crate::cache::ActivityRecord> {
        self.cache()
            .map(|c| c.recent_activity(limit))
            .unwrap_or_default()
    }

    pub fn health_status(&self) -> HealthStatus {
        let api_key_configured = self.client.has_api_key();
        let limits = self
            .config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .rate_limit
            .clone();

        HealthStatus {
            healthy: api_key_configured,
            api_key_configured,
            base_url: self.client.base_url().to_string(),
            cache: self.cache().map(|c| c.stats()),
            rate_limit: self.limiter.usage(DEFAULT_PARTITION),
            limits,
        }
    }
}

fn open_content_cache(config: &Config) -> Result<ContentCache> {
    let store = open_cache_store(Path::new(&config.cache.database_path))?;
    tracing::debug!("Opened cache database {}", config.cache.database_path);
    Ok(ContentCache::new(
        Box::new(store),
        config.cache.enabled,
        config.cache.ttl_seconds,
    ))
}

/// Checks a crawl request and builds its body
fn validate_crawl_request(request: &CrawlRequest) -> std::result::Result<CrawlRequestBody, String> {
    let url = validate_target_url(&request.url).map_err(|e| e.to_string())?;

    if !(1..=MAX_CRAWL_DEPTH).contains(&request.max_depth) {
        return Err(format!(
            "max_depth must be between 1 and {}, got {}",
            MAX_CRAWL_DEPTH, request.max_depth
        ));
    }
    if !(1..=MAX_CRAWL_LIMIT).contains(&request.limit) {
        return Err(format!(
            "limit must be between 1 and {}, got {}",
            MAX_CRAWL_LIMIT, request.limit
        ));
    }

    for pattern in request.include_paths.iter().chain(&request.exclude_paths) {
        if pattern.trim().is_empty() {
            return Err("path patterns cannot be empty".to_string());
        }
        Regex::new(pattern).map_err(|e| format!("invalid path pattern '{}': {}", pattern, e))?;
    }

    let formats = if request.formats.is_empty() {
        vec![ScrapeFormat::Markdown]
    } else {
        request.formats.clone()
    };

    Ok(CrawlRequestBody {
        url: url.to_string(),
        max_depth: request.max_depth,
        limit: request.limit,
        include_paths: request.include_paths.clone(),
        exclude_paths: request.exclude_paths.clone(),
        scrape_options: Some(NestedScrapeOptions {
            formats,
            only_main_content: None,
        }),
    })
}

fn format_list(formats: &[ScrapeFormat]) -> String {
    formats
        .iter()
        .map(ScrapeFormat::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Digest of the scrape options other than URL and formats
fn scrape_options_fingerprint(request: &ScrapeRequest) -> String {
    let headers: BTreeMap<&str, &str> = request
        .headers
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let options = json!({
        "only_main_content": request.only_main_content,
        "include_tags": request.include_tags,
        "exclude_tags": request.exclude_tags,
        "headers": headers,
        "wait_for_ms": request.wait_for_ms,
        "timeout_ms": request.timeout_ms,
        "actions": request.actions,
    });
    fingerprint(&[options.to_string().as_str()])
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

/// Short digest of request parameters that affect the cached result
fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(&hasher.finalize()[..8])
}
