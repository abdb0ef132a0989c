//! Service initialization and application state setup

use crate::state::AppState;
use anyhow::Result;
use filedrop_core::Config;
use filedrop_db::create_metadata_store;
use filedrop_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

/// Build the metadata store and start the worker pool, returning the application state
pub fn initialize_services(
    config: &Config,
    pool: Option<PgPool>,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let metadata = create_metadata_store(config, pool)?;

    let state = AppState::new(config.clone(), metadata, storage);

    tracing::info!(
        worker_count = state.workers.worker_count(),
        queue_capacity = state.queue.capacity(),
        enqueue_timeout_ms = config.enqueue_timeout_ms,
        "Processing services initialized"
    );

    Ok(Arc::new(state))
}
