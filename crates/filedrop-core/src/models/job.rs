use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::file::ProcessingStatus;

/// One unit of deferred work: hash the blob behind `storage_key` and complete the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingJob {
    pub file_id: Uuid,
    pub storage_key: String,
    pub original_filename: String,
}

impl ProcessingJob {
    pub fn new(
        file_id: Uuid,
        storage_key: impl Into<String>,
        original_filename: impl Into<String>,
    ) -> Self {
        Self {
            file_id,
            storage_key: storage_key.into(),
            original_filename: original_filename.into(),
        }
    }
}

/// Content-derived attributes computed by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    pub sha256: String,
    pub size_bytes: u64,
    /// Last `.`-suffix of the original filename, dot included; empty when there is none
    pub extension: String,
}

/// The only ways a record may leave `processing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusTransition {
    Completed(FileDigest),
    Failed { reason: String },
}

impl StatusTransition {
    pub fn target_status(&self) -> ProcessingStatus {
        match self {
            StatusTransition::Completed(_) => ProcessingStatus::Completed,
            StatusTransition::Failed { .. } => ProcessingStatus::Failed,
        }
    }
}
