//! Feed monitoring and medical page parsing end-to-end

use crate::common::service;
use chrono::{TimeZone, Utc};
use clinic_scout::extract::ExtractionType;
use clinic_scout::research::{MedicalParseRequest, RssMonitorRequest};
use clinic_scout::review::{ReviewOutcome, WarningKind};
use clinic_scout::rss::RssFilters;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED_URL: &str = "https://clinic.example/feed.xml";

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Clinic Blog</title>
    <link>https://clinic.example/blog</link>
    <item>
      <title>Knee surgery recovery tips</title>
      <link>https://clinic.example/blog/knee</link>
      <description><![CDATA[<p>What to expect in the <b>first six weeks</b>.</p>]]></description>
      <pubDate>Mon, 06 Oct 2025 09:00:00 +0000</pubDate>
      <dc:creator>Dr. Lee</dc:creator>
      <category>Orthopaedics</category>
    </item>
    <item>
      <title>Shoulder exercises</title>
      <link>https://clinic.example/blog/shoulder</link>
      <description>Five stretches for desk workers.</description>
      <pubDate>Tue, 07 Oct 2025 09:00:00 +0000</pubDate>
      <dc:creator>Dr. Patel</dc:creator>
    </item>
    <item>
      <title>Knee pain myths</title>
      <link>https://clinic.example/blog/myths</link>
      <description>Old post.</description>
      <pubDate>Tue, 01 Jan 2019 09:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

async fn mount_feed(server: &MockServer, body: &str) {
    Mock::given(method("POST"))
        .and(path("/scrape"))
        .and(body_partial_json(json!({"url": FEED_URL, "formats": ["rawHtml"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"rawHtml": body, "metadata": {"sourceURL": FEED_URL}}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_feed_is_parsed_and_filtered() {
    let mock_server = MockServer::start().await;
    mount_feed(&mock_server, FEED).await;

    let service = service(&mock_server);

    let mut request = RssMonitorRequest::new(FEED_URL);
    request.filters = RssFilters {
        keywords: vec!["KNEE".to_string()],
        date_from: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
        ..Default::default()
    };

    let result = service.monitor_rss_feed(request).await;
    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(result.total_items, 3);
    assert_eq!(result.items.len(), 1);

    let item = &result.items[0];
    assert_eq!(item.title, "Knee surgery recovery tips");
    assert!(item.description.starts_with("What to expect in the first six weeks"));
    assert!(!item.description.contains('<'));
    assert_eq!(item.author.as_deref(), Some("Dr. Lee"));
    assert_eq!(item.categories, vec!["Orthopaedics".to_string()]);
    assert!(item.full_content.is_none());
}

#[tokio::test]
async fn test_feed_author_filter_and_item_cap() {
    let mock_server = MockServer::start().await;
    mount_feed(&mock_server, FEED).await;

    let service = service(&mock_server);

    let mut request = RssMonitorRequest::new(FEED_URL);
    request.filters.authors = vec!["patel".to_string()];
    let result = service.monitor_rss_feed(request).await;
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].title, "Shoulder exercises");

    // The cap applies before filtering
    let mut capped = RssMonitorRequest::new(FEED_URL);
    capped.max_items = Some(1);
    capped.filters.authors = vec!["patel".to_string()];
    let result = service.monitor_rss_feed(capped).await;
    assert!(result.success);
    assert_eq!(result.total_items, 3);
    assert!(result.items.is_empty());
}

#[tokio::test]
async fn test_feed_full_content() {
    let mock_server = MockServer::start().await;
    mount_feed(&mock_server, FEED).await;

    Mock::given(method("POST"))
        .and(path("/scrape"))
        .and(body_partial_json(json!({
            "url": "https://clinic.example/blog/knee",
            "formats": ["markdown"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"markdown": "# Recovery\n\nWalk daily."}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    let mut request = RssMonitorRequest::new(FEED_URL);
    request.max_items = Some(1);
    request.include_full_content = true;

    let result = service.monitor_rss_feed(request).await;
    assert!(result.success);
    assert_eq!(result.items.len(), 1);
    assert_eq!(
        result.items[0].full_content.as_deref(),
        Some("# Recovery\n\nWalk daily.")
    );
}

#[tokio::test]
async fn test_malformed_feed_reports_failure() {
    let mock_server = MockServer::start().await;
    mount_feed(&mock_server, "<rss><channel><item><title>Broken</channel></rss>").await;

    let service = service(&mock_server);
    let result = service.monitor_rss_feed(RssMonitorRequest::new(FEED_URL)).await;

    assert!(!result.success);
    assert!(result.items.is_empty());
    assert!(result.error.is_some());

    let activity = service.recent_activity(1);
    assert_eq!(activity[0].action_type, "rss");
}

#[tokio::test]
async fn test_medical_page_is_extracted_and_reviewed() {
    let mock_server = MockServer::start().await;
    let url = "https://clinic.example/services/knee";

    Mock::given(method("POST"))
        .and(path("/scrape"))
        .and(body_partial_json(json!({"url": url})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "markdown": "We provide the best knee rehabilitation in town. Book online today.",
                "metadata": {"title": "Knee Rehab", "sourceURL": url}
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/extract"))
        .and(body_partial_json(json!({"urls": [url]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"title": "Knee Rehab", "main_points": ["Assessment", "Exercise plan"]}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);
    let result = service
        .parse_medical_website(MedicalParseRequest::new(url))
        .await;

    assert!(result.success, "error: {:?}", result.error);
    assert!(result.scrape.success);

    let extraction = result.extraction.expect("extraction should run");
    assert_eq!(extraction.extraction_type, ExtractionType::Generic);
    assert!(extraction.is_success());

    let review = result.review.expect("review should run");
    assert_eq!(review.outcome, ReviewOutcome::NeedsHumanReview);
    assert!(review
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::MarketingSuperlative && w.phrase == "best"));
}

#[tokio::test]
async fn test_medical_page_scrape_failure_skips_extraction() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/scrape"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/extract"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);
    let result = service
        .parse_medical_website(MedicalParseRequest::new("https://clinic.example/down"))
        .await;

    assert!(!result.success);
    assert!(result.extraction.is_none());
    assert!(result.review.is_none());
    assert!(result.error.unwrap_or_default().contains("503"));
}
