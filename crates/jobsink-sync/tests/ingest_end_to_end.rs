//! End-to-end pipeline runs against a mock provider and an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use jobsink_adapters::{ProviderError, SerpApiClient, SerpApiConfig};
use jobsink_storage::JobStore;
use jobsink_sync::{IngestPipeline, PipelineError};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn pipeline_against(server: &MockServer) -> (IngestPipeline, JobStore) {
    let store = JobStore::in_memory().await.expect("store");
    let source = SerpApiClient::new(SerpApiConfig {
        base_url: format!("{}/search.json", server.uri()),
        api_key: "test-key".to_string(),
        timeout: Duration::from_secs(5),
    })
    .expect("client");
    (IngestPipeline::new(Arc::new(source), store.clone()), store)
}

#[tokio::test]
async fn run_once_persists_fetched_jobs_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs_results": [{
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
            }]
        })))
        .mount(&server)
        .await;
    let (pipeline, store) = pipeline_against(&server).await;

    let first = pipeline
        .run_once("Software Engineer", "San Francisco, CA")
        .await
        .expect("first run");
    assert_eq!(first.fetched, 1);
    assert_eq!(first.inserted, 1);

    let stored = store
        .get_by_id("12345")
        .await
        .expect("get")
        .expect("job present");
    assert_eq!(stored.job_title, "Software Developer");
    assert_eq!(stored.benefits, "Health benefits, Retirement plan");

    // An identical second run must leave stored state untouched.
    let second = pipeline
        .run_once("Software Engineer", "San Francisco, CA")
        .await
        .expect("second run");
    assert_eq!(second.fetched, 1);
    assert_eq!(second.inserted, 0);
    assert_eq!(store.get_all().await.expect("get_all").len(), 1);
}

#[tokio::test]
async fn run_once_propagates_invalid_response_for_empty_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobs_results": []})))
        .mount(&server)
        .await;
    let (pipeline, store) = pipeline_against(&server).await;

    let err = pipeline
        .run_once("Software Engineer", "San Francisco, CA")
        .await
        .expect_err("empty result set must fail the run");
    assert!(matches!(
        err,
        PipelineError::Provider(ProviderError::InvalidResponse)
    ));
    assert!(store.get_all().await.expect("get_all").is_empty());
}

#[tokio::test]
async fn run_once_propagates_invalid_response_for_provider_outage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let (pipeline, _store) = pipeline_against(&server).await;

    let err = pipeline
        .run_once("Software Engineer", "San Francisco, CA")
        .await
        .expect_err("provider outage must fail the run");
    assert!(matches!(
        err,
        PipelineError::Provider(ProviderError::InvalidResponse)
    ));
}
