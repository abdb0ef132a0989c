//! Health check handler and response types.

use crate::constants::HEALTH_CHECK_KEY;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);
const HEALTHY: &str = "healthy";

/// Run an async check with timeout; returns status string "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => HEALTHY.to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(serde::Serialize)]
pub(super) struct QueueHealth {
    pub capacity: usize,
    pub in_flight: usize,
    pub accepting: bool,
}

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub metadata_store: String,
    pub storage: String,
    pub workers: usize,
    pub queue: QueueHealth,
}

/// Metadata store and blob storage reachability, plus queue occupancy.
pub(super) async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let metadata = state.metadata.clone();
    let metadata_store = run_check(TIMEOUT, async move { metadata.ping().await }, "unhealthy").await;

    let storage = state.storage.clone();
    let storage = run_check(
        TIMEOUT,
        async move { storage.exists(HEALTH_CHECK_KEY).await.map(drop) },
        "unhealthy",
    )
    .await;

    let queue = QueueHealth {
        capacity: state.queue.capacity(),
        in_flight: state.queue.in_flight(),
        accepting: !state.queue.is_closed(),
    };

    let overall_healthy = metadata_store == HEALTHY && storage == HEALTHY && queue.accepting;
    if !overall_healthy {
        tracing::warn!(
            metadata_store = %metadata_store,
            storage = %storage,
            accepting = queue.accepting,
            "Health check failed"
        );
    }

    let response = HealthCheckResponse {
        status: if overall_healthy { "healthy" } else { "unhealthy" }.to_string(),
        metadata_store,
        storage,
        workers: state.workers.worker_count(),
        queue,
    };

    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
