//! HTTP layer: liveness and the manual fetch trigger.

use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use jobsink_sync::IngestPipeline;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::error;

pub const CRATE_NAME: &str = "jobsink-web";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestPipeline>,
    pub search_query: String,
    pub search_location: String,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/jobs/", get(liveness_handler))
        .route("/jobs/trigger-fetch", post(trigger_fetch_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn liveness_handler() -> Json<serde_json::Value> {
    Json(json!({"message": "The jobsink service is up and running!"}))
}

/// Runs the pipeline once with the configured default query and location.
/// A propagated failure becomes a 500 carrying the error's message.
async fn trigger_fetch_handler(State(state): State<Arc<AppState>>) -> Response {
    match state
        .pipeline
        .run_once(&state.search_query, &state.search_location)
        .await
    {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "message": "job data fetch completed",
                "run_id": summary.run_id,
                "fetched": summary.fetched,
                "inserted": summary.inserted,
            })),
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "manual fetch trigger failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            )
                .into_response()
        }
    }
}
