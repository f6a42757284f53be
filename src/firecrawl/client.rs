use crate::firecrawl::types::{
    CrawlRequestBody, CrawlStartResponse, CrawlStatusResponse, ExtractRequestBody,
    ExtractResponse, ScrapeData, ScrapeRequestBody, ScrapeResponse, SearchHitData,
    SearchRequestBody, SearchResponse,
};
use crate::ratelimit::{RateLimiter, DEFAULT_PARTITION};
use crate::{Result, ScoutError};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Builds the HTTP client used for provider calls
///
/// # Arguments
///
/// * `timeout` - Total per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(timeout: Duration) -> std::result::Result<Client, reqwest::Error> {
    let user_agent = format!("clinic-scout/{}", env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rate-limited client for the scraping provider
///
/// Every request waits on the shared limiter before it is sent.
pub struct FirecrawlClient {
    http: Client,
    base_url: String,
    api_key: RwLock<Option<String>>,
    limiter: Arc<RateLimiter>,
}

impl FirecrawlClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: RwLock::new(api_key.filter(|k| !k.trim().is_empty())),
            limiter,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.current_key().is_some()
    }

    /// Replaces the bearer token used for subsequent requests
    pub fn set_api_key(&self, api_key: Option<String>) {
        let mut guard = self
            .api_key
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = api_key.filter(|k| !k.trim().is_empty());
    }

    fn current_key(&self) -> Option<String> {
        self.api_key
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Scrapes a single URL
    pub async fn scrape(&self, body: &ScrapeRequestBody) -> Result<ScrapeData> {
        let response: ScrapeResponse = self.post_json("scrape", body).await?;
        Ok(response.data)
    }

    /// Starts an asynchronous crawl job and returns its provider id
    pub async fn start_crawl(&self, body: &CrawlRequestBody) -> Result<CrawlStartResponse> {
        self.post_json("crawl", body).await
    }

    /// Fetches the current state of a crawl job
    pub async fn crawl_status(&self, job_id: &str) -> Result<CrawlStatusResponse> {
        let job_id = job_id.trim();
        if job_id.is_empty() || job_id.contains('/') {
            return Err(ScoutError::InvalidRequest(format!(
                "Invalid crawl job id: '{}'",
                job_id
            )));
        }
        self.get_json(&format!("crawl/{}", job_id)).await
    }

    /// Follows the `next` link of a paginated crawl status
    ///
    /// Only links under the configured base URL are followed so that the
    /// bearer token is never sent elsewhere.
    pub async fn crawl_status_next(&self, next: &str) -> Result<CrawlStatusResponse> {
        let endpoint = next
            .strip_prefix(&self.base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| rest.starts_with("crawl/"))
            .ok_or_else(|| {
                ScoutError::InvalidRequest(format!("Refusing to follow crawl page link: {}", next))
            })?;
        self.get_json(endpoint).await
    }

    /// Runs a web search
    pub async fn search(&self, body: &SearchRequestBody) -> Result<Vec<SearchHitData>> {
        let response: SearchResponse = self.post_json("search", body).await?;
        Ok(response.data)
    }

    /// Runs schema-guided extraction and returns the raw `data` object
    pub async fn extract(&self, body: &ExtractRequestBody) -> Result<Value> {
        let response: ExtractResponse = self.post_json("extract", body).await?;
        Ok(response.data)
    }

    async fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint);
        let request = self.http.post(&url).json(body);
        self.send(endpoint, &url, request).await
    }

    async fn get_json<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R> {
        let url = self.endpoint_url(endpoint);
        let request = self.http.get(&url);
        self.send(endpoint, &url, request).await
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// Shared request path: key check, rate limit, send, decode
    async fn send<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<R> {
        let api_key = self.current_key().ok_or(ScoutError::MissingApiKey)?;

        self.limiter.wait_for_limit(DEFAULT_PARTITION).await;

        tracing::debug!("Calling {}", url);
        let response = request
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|source| ScoutError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("{} returned HTTP {}", endpoint, status.as_u16());
            return Err(ScoutError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|source| ScoutError::Http {
            url: url.to_string(),
            source,
        })?;

        decode_envelope(endpoint, status.as_u16(), &text)
    }
}

/// Decodes a provider response body
///
/// Bodies with `"success": false` become API errors carrying the provider's
/// `error` message even when the HTTP status was 2xx.
fn decode_envelope<R: DeserializeOwned>(endpoint: &str, status: u16, text: &str) -> Result<R> {
    let value: Value = serde_json::from_str(text).map_err(|e| ScoutError::Parse {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })?;

    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("provider reported failure")
            .to_string();
        return Err(ScoutError::Api {
            status,
            body: message,
        });
    }

    serde_json::from_value(value).map_err(|e| ScoutError::Parse {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}
