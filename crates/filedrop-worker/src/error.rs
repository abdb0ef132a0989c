use std::time::Duration;

use filedrop_db::MetadataStoreError;
use filedrop_storage::StorageError;
use thiserror::Error;
use uuid::Uuid;

/// Why a job could not be accepted by the queue
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum JobQueueError {
    #[error("job queue is closed")]
    QueueClosed,

    #[error("job queue stayed full for {}ms", .waited.as_millis())]
    BackPressure { waited: Duration },
}

/// Failure of one pipeline run. The job is dropped; nothing is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("blob {key} is unreadable: {source}")]
    BlobUnreadable {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("hashing blob {key} failed: {source}")]
    HashComputationFailed {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("recording digest for file {file_id} failed: {source}")]
    MetadataUpdateFailed {
        file_id: Uuid,
        #[source]
        source: MetadataStoreError,
    },
}

impl PipelineError {
    /// Whether it is still worth driving the record to `failed` after this error.
    pub fn record_still_processing(&self) -> bool {
        !matches!(
            self,
            PipelineError::MetadataUpdateFailed {
                source: MetadataStoreError::AlreadyTerminal { .. } | MetadataStoreError::NotFound(_),
                ..
            }
        )
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker pool shutdown timed out with {pending} job(s) still in flight")]
    ShutdownTimeout { pending: usize },
}

impl From<JobQueueError> for filedrop_core::AppError {
    fn from(err: JobQueueError) -> Self {
        use filedrop_core::AppError;
        match err {
            JobQueueError::BackPressure { .. } => AppError::QueueFull(err.to_string()),
            JobQueueError::QueueClosed => AppError::ShuttingDown(err.to_string()),
        }
    }
}
