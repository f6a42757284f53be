//! Crawl job start, polling, pagination and caching

use crate::common::service;
use clinic_scout::research::{CrawlRequest, CrawlStatus};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_crawl_start_returns_pending_job() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/crawl"))
        .and(body_partial_json(json!({
            "url": "https://clinic.example/",
            "maxDepth": 3,
            "limit": 25,
            "includePaths": ["/services/.*"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "id": "job-42",
            "url": format!("{}/crawl/job-42", mock_server.uri())
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    let mut request = CrawlRequest::new("https://clinic.example/");
    request.max_depth = 3;
    request.limit = 25;
    request.include_paths = vec!["/services/.*".to_string()];

    let job = service.crawl_website(request).await;
    assert_eq!(job.id.as_deref(), Some("job-42"));
    assert_eq!(job.status, CrawlStatus::Pending);
    assert!(job.started_at.is_some());
    assert!(job.error.is_none());
}

#[tokio::test]
async fn test_crawl_bounds_are_checked_locally() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    let mut too_deep = CrawlRequest::new("https://clinic.example/");
    too_deep.max_depth = 11;
    let job = service.crawl_website(too_deep).await;
    assert_eq!(job.status, CrawlStatus::Failed);
    assert!(job.id.is_none());
    assert!(job.error.unwrap_or_default().contains("max_depth"));

    let mut too_many = CrawlRequest::new("https://clinic.example/");
    too_many.limit = 0;
    let job = service.crawl_website(too_many).await;
    assert_eq!(job.status, CrawlStatus::Failed);
    assert!(job.error.unwrap_or_default().contains("limit"));
}

#[tokio::test]
async fn test_crawl_in_progress_is_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/crawl/job-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "status": "scraping",
            "total": 10,
            "completed": 4,
            "data": []
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    for _ in 0..2 {
        let job = service.check_crawl_status("job-7").await;
        assert_eq!(job.status, CrawlStatus::Processing);
        assert_eq!(job.total_pages, 10);
        assert_eq!(job.completed_pages, 4);
        assert!(!job.from_cache);
    }
}

#[tokio::test]
async fn test_completed_crawl_follows_pages_and_caches() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/crawl/job-9"))
        .and(query_param("skip", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "status": "completed",
            "total": 2,
            "completed": 2,
            "data": [{
                "markdown": "Physiotherapy",
                "metadata": {"sourceURL": "https://clinic.example/physio", "statusCode": 200}
            }]
        })))
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/crawl/job-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "status": "completed",
            "total": 2,
            "completed": 2,
            "creditsUsed": 2,
            "next": format!("{}/crawl/job-9?skip=1", base),
            "data": [{
                "markdown": "Welcome",
                "metadata": {"sourceURL": "https://clinic.example/", "statusCode": 200}
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    let job = service.check_crawl_status("job-9").await;
    assert_eq!(job.status, CrawlStatus::Completed, "error: {:?}", job.error);
    assert!(job.completed_at.is_some());
    let urls: Vec<&str> = job.results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["https://clinic.example/", "https://clinic.example/physio"]);

    let cached = service.check_crawl_status("job-9").await;
    assert!(cached.from_cache);
    assert_eq!(cached.results.len(), 2);
}

#[tokio::test]
async fn test_foreign_next_link_is_not_followed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/crawl/job-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "status": "completed",
            "total": 2,
            "completed": 2,
            "next": "https://attacker.example/crawl/job-5?skip=1",
            "data": [{"markdown": "Home"}]
        })))
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);
    let job = service.check_crawl_status("job-5").await;

    assert_eq!(job.status, CrawlStatus::Failed);
    assert!(job.error.unwrap_or_default().contains("Refusing"));
}

#[tokio::test]
async fn test_failed_crawl_job() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/crawl/job-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "status": "failed",
            "total": 0,
            "completed": 0,
            "data": []
        })))
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);
    let job = service.check_crawl_status("job-3").await;

    assert_eq!(job.status, CrawlStatus::Failed);
    assert!(job.error.is_some());
    assert!(!job.from_cache);
}

#[tokio::test]
async fn test_unknown_job_id_reports_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/crawl/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "error": "Job not found"
        })))
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);
    let job = service.check_crawl_status("nope").await;

    assert_eq!(job.status, CrawlStatus::Failed);
    assert_eq!(job.id.as_deref(), Some("nope"));
    assert!(job.error.unwrap_or_default().contains("404"));
}
