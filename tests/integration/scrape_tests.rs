//! Single-page scraping, caching, errors and runtime reconfiguration

use crate::common::{service, service_with_key, API_KEY};
use clinic_scout::config::ConfigUpdate;
use clinic_scout::research::ScrapeRequest;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page_body(url: &str, markdown: &str) -> serde_json::Value {
    json!({
        "success": true,
        "data": {
            "markdown": markdown,
            "metadata": {
                "title": "Knee Pain",
                "sourceURL": url,
                "statusCode": 200
            }
        }
    })
}

#[tokio::test]
async fn test_scrape_then_cache_hit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/scrape"))
        .and(header("authorization", format!("Bearer {}", API_KEY).as_str()))
        .and(body_partial_json(json!({
            "url": "https://clinic.example/knee-pain",
            "formats": ["markdown"]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body("https://clinic.example/knee-pain", "# Knee pain")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    let first = service
        .scrape_url(ScrapeRequest::new("https://clinic.example/knee-pain"))
        .await;
    assert!(first.success, "unexpected error: {:?}", first.error);
    assert!(!first.from_cache);
    assert_eq!(first.markdown.as_deref(), Some("# Knee pain"));
    assert_eq!(
        first.metadata.as_ref().and_then(|m| m.title.as_deref()),
        Some("Knee Pain")
    );

    // Tracking parameters and the www. prefix do not change the cache identity
    let second = service
        .scrape_url(ScrapeRequest::new(
            "https://www.clinic.example/knee-pain?utm_source=newsletter",
        ))
        .await;
    assert!(second.success);
    assert!(second.from_cache);
    assert_eq!(second.markdown.as_deref(), Some("# Knee pain"));

    let activity = service.recent_activity(10);
    assert_eq!(activity.len(), 2);
    assert!(activity.iter().all(|r| r.action_type == "scrape"));
}

#[tokio::test]
async fn test_skip_cache_fetches_again() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/scrape"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body("https://clinic.example/hours", "Open weekdays")),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    let first = service
        .scrape_url(ScrapeRequest::new("https://clinic.example/hours"))
        .await;
    assert!(first.success);

    let mut request = ScrapeRequest::new("https://clinic.example/hours");
    request.skip_cache = true;
    let second = service.scrape_url(request).await;
    assert!(second.success);
    assert!(!second.from_cache);
}

#[tokio::test]
async fn test_scrape_provider_error_is_reported_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/scrape"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    for _ in 0..2 {
        let result = service
            .scrape_url(ScrapeRequest::new("https://clinic.example/broken"))
            .await;
        assert!(!result.success);
        assert!(!result.from_cache);
        let error = result.error.unwrap_or_default();
        assert!(error.contains("500"), "unexpected error: {}", error);
        assert!(error.contains("upstream exploded"));
    }
}

#[tokio::test]
async fn test_success_false_envelope_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/scrape"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "Insufficient credits"
        })))
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);
    let result = service
        .scrape_url(ScrapeRequest::new("https://clinic.example/"))
        .await;

    assert!(!result.success);
    assert!(result
        .error
        .unwrap_or_default()
        .contains("Insufficient credits"));
}

#[tokio::test]
async fn test_missing_api_key_makes_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_with_key(&mock_server, None);
    let result = service
        .scrape_url(ScrapeRequest::new("https://clinic.example/"))
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap_or_default().contains("API key"));
    assert!(!service.health_status().healthy);
}

#[tokio::test]
async fn test_invalid_url_is_rejected_locally() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    for url in ["", "ftp://clinic.example/file", "not a url"] {
        let result = service.scrape_url(ScrapeRequest::new(url)).await;
        assert!(!result.success, "{} should be rejected", url);
    }
}

#[tokio::test]
async fn test_configure_api_key_at_runtime() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/scrape"))
        .and(header("authorization", "Bearer rotated-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body("https://clinic.example/team", "Our team")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_with_key(&mock_server, None);
    service
        .configure(ConfigUpdate {
            api_key: Some("rotated-key".to_string()),
            ..Default::default()
        })
        .unwrap();

    assert!(service.health_status().api_key_configured);

    let result = service
        .scrape_url(ScrapeRequest::new("https://clinic.example/team"))
        .await;
    assert!(result.success);
}

#[tokio::test]
async fn test_invalid_configure_changes_nothing() {
    let mock_server = MockServer::start().await;
    let service = service(&mock_server);

    let err = service.configure(ConfigUpdate {
        per_minute: Some(0),
        ..Default::default()
    });
    assert!(err.is_err());
    assert_eq!(service.health_status().limits.per_minute, 600);
}

#[tokio::test]
async fn test_clear_cache_forces_refetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/scrape"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body("https://clinic.example/contact", "Call us")),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    service
        .scrape_url(ScrapeRequest::new("https://clinic.example/contact"))
        .await;
    assert_eq!(service.health_status().cache.map(|c| c.live_entries), Some(1));

    assert_eq!(service.purge_cache(), 1);

    let again = service
        .scrape_url(ScrapeRequest::new("https://clinic.example/contact"))
        .await;
    assert!(!again.from_cache);
}

#[tokio::test]
async fn test_scrape_options_are_part_of_cache_identity() {
    let mock_server = MockServer::start().await;
    let url = "https://clinic.example/booking";

    Mock::given(method("POST"))
        .and(path("/scrape"))
        .and(body_partial_json(json!({"url": url, "waitFor": 3000})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_body(url, "Slots: Mon 9:00, Tue 14:00")),
        )
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/scrape"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(url, "Loading...")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    let plain = service.scrape_url(ScrapeRequest::new(url)).await;
    assert_eq!(plain.markdown.as_deref(), Some("Loading..."));

    let mut rendered = ScrapeRequest::new(url);
    rendered.wait_for_ms = Some(3000);
    let rendered = service.scrape_url(rendered).await;
    assert!(!rendered.from_cache);
    assert_eq!(rendered.markdown.as_deref(), Some("Slots: Mon 9:00, Tue 14:00"));

    let repeat = service.scrape_url(ScrapeRequest::new(url)).await;
    assert!(repeat.from_cache);
    assert_eq!(repeat.markdown.as_deref(), Some("Loading..."));
}

#[tokio::test]
async fn test_activity_is_attributed_to_actor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/scrape"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body("https://clinic.example/team", "Our physios")),
        )
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    service
        .scrape_url(ScrapeRequest::new("https://clinic.example/team"))
        .await;
    service.set_actor(Some("editor@clinic.example".to_string()));
    service
        .scrape_url(ScrapeRequest::new("https://clinic.example/team"))
        .await;

    let activity = service.recent_activity(2);
    assert_eq!(activity[0].actor.as_deref(), Some("editor@clinic.example"));
    assert_eq!(activity[1].actor, None);
}
