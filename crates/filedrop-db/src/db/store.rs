use async_trait::async_trait;
use filedrop_core::models::{FileMetadata, ProcessingStatus, StatusTransition};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MetadataStoreError {
    #[error("File {0} is already registered")]
    DuplicateId(Uuid),

    #[error("File {0} not found")]
    NotFound(Uuid),

    #[error("File {id} is already {status}")]
    AlreadyTerminal { id: Uuid, status: ProcessingStatus },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type MetadataStoreResult<T> = Result<T, MetadataStoreError>;

/// Durable id → file metadata mapping.
///
/// Implementations enforce the status state machine: records are created `processing`
/// and `transition_status` succeeds at most once per record.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Create a record in the `processing` state.
    async fn register(
        &self,
        id: Uuid,
        filename: &str,
        storage_key: &str,
    ) -> MetadataStoreResult<FileMetadata>;

    /// Move a `processing` record to its terminal state.
    async fn transition_status(
        &self,
        id: Uuid,
        transition: StatusTransition,
    ) -> MetadataStoreResult<FileMetadata>;

    async fn get(&self, id: Uuid) -> MetadataStoreResult<Option<FileMetadata>>;

    /// Every record, oldest first
    async fn list_all(&self) -> MetadataStoreResult<Vec<FileMetadata>>;

    /// Cheap connectivity check used by the health endpoint
    async fn ping(&self) -> MetadataStoreResult<()>;
}

impl From<MetadataStoreError> for filedrop_core::AppError {
    fn from(err: MetadataStoreError) -> Self {
        use filedrop_core::AppError;
        match err {
            MetadataStoreError::NotFound(id) => AppError::NotFound(format!("File {} not found", id)),
            err @ (MetadataStoreError::DuplicateId(_) | MetadataStoreError::AlreadyTerminal { .. }) => {
                AppError::Conflict(err.to_string())
            }
            MetadataStoreError::Database(e) => AppError::Database(e),
        }
    }
}
