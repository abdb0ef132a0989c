//! Filedrop metadata persistence
//!
//! The `MetadataStore` contract consumed by the ingestion gateway and the worker pool,
//! with a PostgreSQL implementation and an in-memory one.

pub mod db;

pub use db::{
    create_metadata_store, InMemoryMetadataStore, MetadataStore, MetadataStoreError,
    MetadataStoreResult, PgMetadataRepository,
};
