//! Ingestion pipeline orchestration: one fetch-map-store run, the recurring
//! scheduler around it, and process configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jobsink_adapters::{JobSource, ProviderError, SerpApiClient, SerpApiConfig, DEFAULT_BASE_URL};
use jobsink_storage::{JobStore, StoreError};
use serde::Serialize;
use thiserror::Error;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};
use uuid::Uuid;

pub const CRATE_NAME: &str = "jobsink-sync";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub api_key: String,
    pub base_url: String,
    pub search_query: String,
    pub search_location: String,
    pub scheduler_enabled: bool,
    pub fetch_cron: String,
    pub http_timeout_secs: u64,
    pub web_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://jobsink.db".to_string()),
            api_key: std::env::var("SERPAPI_API_KEY").unwrap_or_default(),
            base_url: std::env::var("SERPAPI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            search_query: std::env::var("JOBSINK_SEARCH_QUERY")
                .unwrap_or_else(|_| "Software Engineer".to_string()),
            search_location: std::env::var("JOBSINK_SEARCH_LOCATION")
                .unwrap_or_else(|_| "San Francisco, CA".to_string()),
            scheduler_enabled: std::env::var("JOBSINK_SCHEDULER_ENABLED")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
                .unwrap_or(false),
            // Six-field cron with seconds: midnight every second day.
            fetch_cron: std::env::var("JOBSINK_FETCH_CRON")
                .unwrap_or_else(|_| "0 0 0 */2 * *".to_string()),
            http_timeout_secs: std::env::var("JOBSINK_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            web_port: std::env::var("JOBSINK_WEB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3500),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fetched: usize,
    pub inserted: usize,
}

/// One fetch-map-store unit of work, invoked by the scheduler or a manual
/// trigger.
pub struct IngestPipeline {
    source: Arc<dyn JobSource>,
    store: JobStore,
}

impl IngestPipeline {
    pub fn new(source: Arc<dyn JobSource>, store: JobStore) -> Self {
        Self { source, store }
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = JobStore::connect(&config.database_url).await?;
        let source = SerpApiClient::new(SerpApiConfig {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.http_timeout_secs),
        })?;
        Ok(Self::new(Arc::new(source), store))
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Fetches one batch for `(query, location)` and upserts it. A provider
    /// `InvalidResponse` propagates to the caller unchanged; the trigger
    /// boundary decides whether that is a logged warning or an error reply.
    pub async fn run_once(&self, query: &str, location: &str) -> Result<RunSummary, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let drafts = self.source.process(query, location).await?;
        let fetched = drafts.len();
        let inserted = self.store.bulk_upsert(&drafts).await?;
        let finished_at = Utc::now();
        info!(%run_id, query, location, fetched, inserted, "ingestion run complete");
        Ok(RunSummary {
            run_id,
            started_at,
            finished_at,
            fetched,
            inserted,
        })
    }
}

/// Recurring fetch driver. Owns its `JobScheduler`; the pipeline callback is
/// injected at start and torn down via [`FetchScheduler::stop`].
pub struct FetchScheduler {
    inner: JobScheduler,
}

impl FetchScheduler {
    /// Starts the cron-driven fetch loop, or returns `None` when disabled by
    /// configuration. A failing tick is logged and the schedule keeps
    /// running.
    pub async fn maybe_start(
        config: &Config,
        pipeline: Arc<IngestPipeline>,
    ) -> Result<Option<Self>> {
        if !config.scheduler_enabled {
            return Ok(None);
        }

        let mut sched = JobScheduler::new().await.context("creating scheduler")?;
        let query = config.search_query.clone();
        let location = config.search_location.clone();
        let job = Job::new_async(config.fetch_cron.as_str(), move |_id, _sched| {
            let pipeline = pipeline.clone();
            let query = query.clone();
            let location = location.clone();
            Box::pin(async move {
                match pipeline.run_once(&query, &location).await {
                    Ok(summary) => info!(
                        run_id = %summary.run_id,
                        fetched = summary.fetched,
                        inserted = summary.inserted,
                        "scheduled fetch complete"
                    ),
                    Err(err) => warn!(error = %err, "scheduled fetch failed"),
                }
            })
        })
        .with_context(|| format!("creating fetch job for cron {}", config.fetch_cron))?;
        sched.add(job).await.context("adding fetch job")?;
        sched.start().await.context("starting scheduler")?;
        info!(cron = %config.fetch_cron, "fetch scheduler started");
        Ok(Some(Self { inner: sched }))
    }

    pub async fn stop(mut self) -> Result<()> {
        self.inner
            .shutdown()
            .await
            .context("shutting down scheduler")?;
        info!("fetch scheduler stopped");
        Ok(())
    }
}
