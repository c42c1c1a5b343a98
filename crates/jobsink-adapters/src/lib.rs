//! Search-provider adapter: fetches raw listing results and maps them into
//! domain records.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use jobsink_core::JobDraft;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::warn;

pub const CRATE_NAME: &str = "jobsink-adapters";

pub const DEFAULT_BASE_URL: &str = "https://serpapi.com/search.json";

/// Fixed engine parameter sent with every search request.
const SEARCH_ENGINE: &str = "google_jobs";

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider call produced no usable results collection: the request
    /// itself failed, the body had no `jobs_results` array, or that array
    /// was empty. An empty result set is treated as a provider malfunction
    /// rather than a legitimate empty batch.
    #[error("search provider returned no data or an unusable response")]
    InvalidResponse,
}

/// Anything the pipeline can pull job drafts from. Implemented by
/// [`SerpApiClient`]; test doubles stand in behind the same seam.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn process(&self, query: &str, location: &str) -> Result<Vec<JobDraft>, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct SerpApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for SerpApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(20),
        }
    }
}

/// HTTP client for the external job-search provider.
#[derive(Debug)]
pub struct SerpApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SerpApiClient {
    pub fn new(config: SerpApiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout)
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            base_url: config.base_url,
            api_key: config.api_key,
        })
    }

    /// Issues one search request. Any transport failure, non-success status,
    /// or undecodable body degrades to `None` ("no data this cycle") and is
    /// logged rather than raised.
    pub async fn fetch(&self, query: &str, location: &str) -> Option<JsonValue> {
        let request = self.http.get(&self.base_url).query(&[
            ("engine", SEARCH_ENGINE),
            ("q", query),
            ("location", location),
            ("api_key", self.api_key.as_str()),
        ]);

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, query, location, "search request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%status, query, location, "search provider returned a non-success status");
            return None;
        }

        match response.json::<JsonValue>().await {
            Ok(body) => Some(body),
            Err(err) => {
                warn!(error = %err, query, location, "search response body was not valid JSON");
                None
            }
        }
    }

    /// Fetches and maps one batch of job drafts, preserving provider order.
    pub async fn process(
        &self,
        query: &str,
        location: &str,
    ) -> Result<Vec<JobDraft>, ProviderError> {
        let body = self
            .fetch(query, location)
            .await
            .ok_or(ProviderError::InvalidResponse)?;
        let items = body
            .get("jobs_results")
            .and_then(JsonValue::as_array)
            .ok_or(ProviderError::InvalidResponse)?;
        if items.is_empty() {
            return Err(ProviderError::InvalidResponse);
        }
        Ok(items.iter().map(map_item).collect())
    }
}

#[async_trait]
impl JobSource for SerpApiClient {
    async fn process(&self, query: &str, location: &str) -> Result<Vec<JobDraft>, ProviderError> {
        SerpApiClient::process(self, query, location).await
    }
}

/// Maps one raw provider item to a draft. Missing keys yield empty strings.
pub fn map_item(item: &JsonValue) -> JobDraft {
    let detected = item.get("detected_extensions");
    JobDraft {
        job_title: text(item, "title"),
        company_name: text(item, "company_name"),
        location: text(item, "location").trim().to_string(),
        description: text(item, "description"),
        date_posted: nested_text(detected, "posted_at"),
        job_type: nested_text(detected, "schedule_type"),
        salary: nested_text(detected, "salary"),
        benefits: joined_strings(item.get("extensions")),
        application_link: nested_text(item.get("apply_link"), "link"),
        related_links: joined_links(item.get("related_links")),
        job_id: text(item, "job_id"),
    }
}

fn text(item: &JsonValue, key: &str) -> String {
    item.get(key)
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}

fn nested_text(object: Option<&JsonValue>, key: &str) -> String {
    object
        .and_then(|o| o.get(key))
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}

fn joined_strings(value: Option<&JsonValue>) -> String {
    value
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(JsonValue::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

fn joined_links(value: Option<&JsonValue>) -> String {
    value
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .map(|link| {
                    link.get("link")
                        .and_then(JsonValue::as_str)
                        .unwrap_or_default()
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}
