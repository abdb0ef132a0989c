//! Application setup and initialization
//!
//! Everything `main` needs to go from a `Config` to a running router, kept out of
//! `main.rs` so integration tests can build the same application.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use filedrop_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.log_format)
        .context("Failed to initialize telemetry")?;

    tracing::info!(
        environment = %config.environment,
        "Configuration loaded and validated successfully"
    );

    // Setup metadata store (PostgreSQL pool only when selected)
    let pool = database::setup_database(&config).await?;

    // Setup blob storage
    let storage = storage::setup_storage(&config).await?;

    // Queue, workers and ingestion
    let state = services::initialize_services(&config, pool, storage)?;

    // Setup routes
    let router = routes::setup_routes(&config, state.clone()).await?;

    Ok((state, router))
}
