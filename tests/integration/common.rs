use clinic_scout::cache::{ContentCache, SqliteCacheStore};
use clinic_scout::config::{Config, RateLimitSettings};
use clinic_scout::ResearchService;
use wiremock::MockServer;

pub const API_KEY: &str = "test-key";

/// Configuration pointing at the mock provider, with roomy rate limits
pub fn test_config(server: &MockServer, api_key: Option<&str>) -> Config {
    let mut config = Config::default();
    config.firecrawl.base_url = server.uri();
    config.firecrawl.api_key = api_key.map(str::to_string);
    config.firecrawl.timeout_secs = 5;
    config.rate_limit = RateLimitSettings {
        per_minute: 600,
        per_hour: 10_000,
        per_day: 100_000,
        burst: 50,
        cooldown_ms: 50,
    };
    config
}

/// Service backed by an in-memory cache
pub fn service_with_key(server: &MockServer, api_key: Option<&str>) -> ResearchService {
    let config = test_config(server, api_key);
    let store = SqliteCacheStore::open_in_memory().expect("Failed to open in-memory cache");
    let cache = ContentCache::new(Box::new(store), true, 3600);
    ResearchService::with_cache(&config, cache).expect("Failed to build service")
}

pub fn service(server: &MockServer) -> ResearchService {
    service_with_key(server, Some(API_KEY))
}
