use async_trait::async_trait;
use filedrop_core::models::{FileMetadata, ProcessingStatus, StatusTransition};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::store::{MetadataStore, MetadataStoreError, MetadataStoreResult};

const FILE_METADATA_COLUMNS: &str = "id, filename, storage_key, sha256, size_bytes, extension, \
     status, failure_reason, created_at, updated_at";

/// Repository for file metadata records in PostgreSQL
#[derive(Clone)]
pub struct PgMetadataRepository {
    pool: PgPool,
}

impl PgMetadataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explain why a conditional update touched no row.
    async fn missed_transition(&self, id: Uuid) -> MetadataStoreError {
        let current = sqlx::query_scalar::<Postgres, ProcessingStatus>(
            "SELECT status FROM file_metadata WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        match current {
            Ok(Some(status)) => MetadataStoreError::AlreadyTerminal { id, status },
            Ok(None) => MetadataStoreError::NotFound(id),
            Err(e) => MetadataStoreError::Database(e),
        }
    }
}

#[async_trait]
impl MetadataStore for PgMetadataRepository {
    #[tracing::instrument(skip(self), fields(db.table = "file_metadata", db.operation = "insert", db.record_id = %id))]
    async fn register(
        &self,
        id: Uuid,
        filename: &str,
        storage_key: &str,
    ) -> MetadataStoreResult<FileMetadata> {
        let query = format!(
            r#"
            INSERT INTO file_metadata (id, filename, storage_key, status)
            VALUES ($1, $2, $3, 'processing')
            RETURNING {}
            "#,
            FILE_METADATA_COLUMNS
        );

        sqlx::query_as::<Postgres, FileMetadata>(&query)
            .bind(id)
            .bind(filename)
            .bind(storage_key)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    MetadataStoreError::DuplicateId(id)
                }
                other => MetadataStoreError::Database(other),
            })
    }

    #[tracing::instrument(
        skip(self, transition),
        fields(
            db.table = "file_metadata",
            db.operation = "update",
            db.record_id = %id,
            status = %transition.target_status()
        )
    )]
    async fn transition_status(
        &self,
        id: Uuid,
        transition: StatusTransition,
    ) -> MetadataStoreResult<FileMetadata> {
        let status = transition.target_status();
        let (sha256, size_bytes, extension, failure_reason) = match transition {
            StatusTransition::Completed(digest) => (
                Some(digest.sha256),
                // BIGINT column; real files never approach i64::MAX bytes
                Some(i64::try_from(digest.size_bytes).unwrap_or(i64::MAX)),
                Some(digest.extension),
                None,
            ),
            StatusTransition::Failed { reason } => (None, None, None, Some(reason)),
        };

        let query = format!(
            r#"
            UPDATE file_metadata
            SET status = $2,
                sha256 = $3,
                size_bytes = $4,
                extension = $5,
                failure_reason = $6,
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            RETURNING {}
            "#,
            FILE_METADATA_COLUMNS
        );

        let updated = sqlx::query_as::<Postgres, FileMetadata>(&query)
            .bind(id)
            .bind(status)
            .bind(sha256)
            .bind(size_bytes)
            .bind(extension)
            .bind(failure_reason)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(record) => Ok(record),
            None => Err(self.missed_transition(id).await),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_metadata", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> MetadataStoreResult<Option<FileMetadata>> {
        let query = format!(
            "SELECT {} FROM file_metadata WHERE id = $1",
            FILE_METADATA_COLUMNS
        );

        let record = sqlx::query_as::<Postgres, FileMetadata>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_metadata", db.operation = "select"))]
    async fn list_all(&self) -> MetadataStoreResult<Vec<FileMetadata>> {
        let query = format!(
            "SELECT {} FROM file_metadata ORDER BY created_at ASC, id ASC",
            FILE_METADATA_COLUMNS
        );

        let records = sqlx::query_as::<Postgres, FileMetadata>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    async fn ping(&self) -> MetadataStoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
