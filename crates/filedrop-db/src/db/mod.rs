//! Metadata store implementations
//
// Store contract and its error type
pub mod store;
//
// PostgreSQL-backed repository
pub mod postgres;
//
// Process-local store for development and tests
pub mod memory;

pub use memory::InMemoryMetadataStore;
pub use postgres::PgMetadataRepository;
pub use store::{MetadataStore, MetadataStoreError, MetadataStoreResult};

use filedrop_core::{Config, MetadataBackend};
use sqlx::PgPool;
use std::sync::Arc;

/// Build the configured metadata store.
///
/// `postgres_pool` must be provided when the configuration selects PostgreSQL.
pub fn create_metadata_store(
    config: &Config,
    postgres_pool: Option<PgPool>,
) -> anyhow::Result<Arc<dyn MetadataStore>> {
    match config.metadata_backend {
        MetadataBackend::Postgres => {
            let pool = postgres_pool.ok_or_else(|| {
                anyhow::anyhow!("PostgreSQL metadata backend selected but no pool was created")
            })?;
            tracing::info!("Initializing PostgreSQL metadata store");
            Ok(Arc::new(PgMetadataRepository::new(pool)))
        }
        MetadataBackend::Memory => {
            tracing::warn!("Using in-memory metadata store; records are lost on restart");
            Ok(Arc::new(InMemoryMetadataStore::new()))
        }
    }
}
