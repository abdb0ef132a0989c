//! Data models for the application
//!
//! File metadata records and the values that flow through the processing pipeline.

mod file;
mod job;

pub use file::*;
pub use job::*;
