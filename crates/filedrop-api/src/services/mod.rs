//! Request-side services shared by handlers
pub mod ingestion;

pub use ingestion::{IngestionGateway, UploadReceipt};
