//! Filedrop API Library
//!
//! This crate provides the HTTP handlers, the ingestion service and application setup.

mod api_doc;
pub mod constants;
mod handlers;
pub mod services;
pub mod setup;
pub mod telemetry;

// Public modules
pub mod error;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::ingestion::{IngestionGateway, UploadReceipt};
pub use state::AppState;
