//! Provider adapter tests against a mock HTTP server.

use std::time::Duration;

use jobsink_adapters::{ProviderError, SerpApiClient, SerpApiConfig};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> SerpApiClient {
    SerpApiClient::new(SerpApiConfig {
        base_url: format!("{}/search.json", server.uri()),
        api_key: "test-key".to_string(),
        timeout: Duration::from_secs(5),
    })
    .expect("building client")
}

fn sample_listing() -> serde_json::Value {
    json!({
        "title": "Software Developer",
        "company_name": "Tech Co",
        "location": "San Francisco, CA",
        "description": "Job Description",
        "detected_extensions": {
            "posted_at": "1 day ago",
            "schedule_type": "Full-time",
            "salary": "$100,000"
        },
        "extensions": ["Health benefits", "Retirement plan"],
        "apply_link": {"link": "https://apply.example.com"},
        "related_links": [{"link": "https://detail.example.com"}],
        "job_id": "12345"
    })
}

#[tokio::test]
async fn fetch_returns_body_and_sends_search_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .and(query_param("engine", "google_jobs"))
        .and(query_param("q", "Software Engineer"))
        .and(query_param("location", "San Francisco, CA"))
        .and(query_param("api_key", "test-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"jobs_results": [sample_listing()]})),
        )
        .mount(&server)
        .await;

    let body = client_for(&server)
        .fetch("Software Engineer", "San Francisco, CA")
        .await
        .expect("expected a response body");
    assert_eq!(
        body["jobs_results"][0]["title"].as_str(),
        Some("Software Developer")
    );
}

#[tokio::test]
async fn fetch_absorbs_server_errors_as_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let body = client_for(&server)
        .fetch("Software Engineer", "San Francisco, CA")
        .await;
    assert!(body.is_none());
}

#[tokio::test]
async fn process_maps_listings_in_provider_order() {
    let server = MockServer::start().await;
    let mut second = sample_listing();
    second["title"] = json!("Backend Engineer");
    second["job_id"] = json!("67890");
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"jobs_results": [sample_listing(), second]})),
        )
        .mount(&server)
        .await;

    let drafts = client_for(&server)
        .process("Software Engineer", "San Francisco, CA")
        .await
        .expect("expected drafts");
    assert_eq!(drafts.len(), 2);
    assert_eq!(drafts[0].job_title, "Software Developer");
    assert_eq!(drafts[1].job_title, "Backend Engineer");
    assert_eq!(drafts[1].job_id, "67890");
}

#[tokio::test]
async fn process_rejects_empty_result_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobs_results": []})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .process("Software Engineer", "San Francisco, CA")
        .await
        .expect_err("empty result set must fail");
    assert!(matches!(err, ProviderError::InvalidResponse));
}

#[tokio::test]
async fn process_rejects_missing_results_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": "Invalid API key"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .process("Software Engineer", "San Francisco, CA")
        .await
        .expect_err("missing collection must fail");
    assert!(matches!(err, ProviderError::InvalidResponse));
}

#[tokio::test]
async fn process_rejects_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .process("Software Engineer", "San Francisco, CA")
        .await
        .expect_err("failed call must surface as invalid response");
    assert!(matches!(err, ProviderError::InvalidResponse));
}
