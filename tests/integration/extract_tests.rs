//! Search and structured extraction against the mock provider

use crate::common::service;
use clinic_scout::extract::{Confidence, ExtractionType};
use clinic_scout::research::{ExtractRequest, SearchRequest, TimeRange};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_search_sends_time_filter_and_caches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({
            "query": "knee physiotherapy",
            "limit": 5,
            "tbs": "qdr:w"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                {
                    "url": "https://physio.example/knee",
                    "title": "Knee rehab",
                    "description": "Exercises after surgery"
                },
                {
                    "url": "https://health.example/acl",
                    "metadata": {"title": "ACL recovery", "description": "Timeline"}
                }
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    let mut request = SearchRequest::new("knee physiotherapy");
    request.limit = Some(5);
    request.time_range = TimeRange::Week;

    let response = service.search_web(request.clone()).await;
    assert!(response.success, "error: {:?}", response.error);
    assert_eq!(response.total, 2);
    assert_eq!(response.results[0].title.as_deref(), Some("Knee rehab"));
    // Titles fall back to page metadata
    assert_eq!(response.results[1].title.as_deref(), Some("ACL recovery"));

    let cached = service.search_web(request).await;
    assert!(cached.from_cache);
    assert_eq!(cached.total, 2);
}

#[tokio::test]
async fn test_search_limit_is_clamped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"limit": 100})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    let mut request = SearchRequest::new("clinic reviews");
    request.limit = Some(500);
    let response = service.search_web(request).await;

    assert!(response.success);
    assert_eq!(response.total, 0);
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);
    let response = service.search_web(SearchRequest::new("   ")).await;

    assert!(!response.success);
    assert!(response.error.is_some());
}

#[tokio::test]
async fn test_batch_extract_continues_after_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/extract"))
        .and(body_partial_json(json!({
            "urls": ["https://pubmed.ncbi.nlm.nih.gov/31234567/"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "title": "Exercise therapy for knee osteoarthritis",
                "authors": ["A. Researcher"],
                "journal": "Journal of Physiotherapy",
                "abstract": "Exercise reduces pain.",
                "pmid": "31234567"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/extract"))
        .and(body_partial_json(json!({
            "urls": ["https://clinic.example/broken"]
        })))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/extract"))
        .and(body_partial_json(json!({
            "urls": ["https://www.who.int/news/item/1"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"organization": "WHO", "title": "", "summary": null}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);

    let results = service
        .extract_content(ExtractRequest {
            urls: vec![
                "https://pubmed.ncbi.nlm.nih.gov/31234567/".to_string(),
                "https://clinic.example/broken".to_string(),
                "https://www.who.int/news/item/1".to_string(),
            ],
            ..Default::default()
        })
        .await;

    assert_eq!(results.len(), 3);

    assert_eq!(results[0].url, "https://pubmed.ncbi.nlm.nih.gov/31234567/");
    assert_eq!(results[0].extraction_type, ExtractionType::Pubmed);
    assert!(results[0].is_success());
    assert_eq!(results[0].confidence, Confidence::High);

    assert_eq!(results[1].url, "https://clinic.example/broken");
    assert!(!results[1].is_success());
    assert_eq!(results[1].confidence, Confidence::Low);
    assert!(results[1].error.is_some());

    assert_eq!(results[2].extraction_type, ExtractionType::HealthOrganization);
    assert!(results[2].is_success());
    assert_eq!(results[2].confidence, Confidence::Low);
}

#[tokio::test]
async fn test_extract_cache_depends_on_prompt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/extract"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"title": "Shoulder pain", "main_points": ["Rest"]}
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);
    let request = |prompt: Option<&str>| ExtractRequest {
        urls: vec!["https://clinic.example/shoulder".to_string()],
        prompt: prompt.map(str::to_string),
        extraction_type: Some(ExtractionType::Generic),
        ..Default::default()
    };

    let first = service.extract_content(request(None)).await;
    assert!(!first[0].from_cache);

    let repeat = service.extract_content(request(None)).await;
    assert!(repeat[0].from_cache);

    let different = service
        .extract_content(request(Some("Focus on exercises")))
        .await;
    assert!(!different[0].from_cache);
}

#[tokio::test]
async fn test_extract_null_data_is_a_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/extract"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": null
        })))
        .mount(&mock_server)
        .await;

    let service = service(&mock_server);
    let results = service
        .extract_content(ExtractRequest {
            urls: vec!["https://clinic.example/empty".to_string()],
            ..Default::default()
        })
        .await;

    assert!(!results[0].is_success());
    assert_eq!(results[0].confidence, Confidence::Low);
}
