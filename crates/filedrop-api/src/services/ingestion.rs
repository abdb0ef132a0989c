//! Upload ingestion
//!
//! Accepts one file per call: streams it into blob storage under a key derived from a
//! fresh id, registers the `processing` record, then hands a job to the worker queue.
//! Every failure after the blob is written undoes what it can, so no record is left
//! `processing` without a job behind it.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use filedrop_core::models::{ProcessingJob, ProcessingStatus, StatusTransition};
use filedrop_core::AppError;
use filedrop_db::MetadataStore;
use filedrop_storage::{file_storage_key, Storage};
use filedrop_worker::{JobQueue, JobQueueError};
use futures::StreamExt;
use serde::Serialize;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::constants::FILE_FIELD;

/// Returned to the client once a file is stored and queued for processing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadReceipt {
    pub id: Uuid,
    pub filename: String,
    pub status: ProcessingStatus,
}

/// A blob written during the current request, not yet registered.
struct StoredBlob {
    id: Uuid,
    filename: String,
    storage_key: String,
    size_bytes: u64,
}

#[derive(Clone)]
pub struct IngestionGateway {
    storage: Arc<dyn Storage>,
    metadata: Arc<dyn MetadataStore>,
    queue: Arc<JobQueue>,
    enqueue_budget: Duration,
}

impl IngestionGateway {
    pub fn new(
        storage: Arc<dyn Storage>,
        metadata: Arc<dyn MetadataStore>,
        queue: Arc<JobQueue>,
        enqueue_budget: Duration,
    ) -> Self {
        Self {
            storage,
            metadata,
            queue,
            enqueue_budget,
        }
    }

    /// Ingest the single `file` field of a multipart body.
    ///
    /// Other fields are skipped. A second `file` field rejects the whole request.
    pub async fn ingest_multipart(
        &self,
        mut multipart: Multipart,
    ) -> Result<UploadReceipt, AppError> {
        let mut stored: Option<StoredBlob> = None;

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    if let Some(blob) = &stored {
                        self.discard_blob(&blob.storage_key).await;
                    }
                    return Err(multipart_error("Failed to read multipart", e));
                }
            };

            if field.name() != Some(FILE_FIELD) {
                continue;
            }

            if let Some(blob) = &stored {
                self.discard_blob(&blob.storage_key).await;
                return Err(AppError::InvalidInput(
                    "Multiple file fields are not allowed; send exactly one field named 'file'"
                        .to_string(),
                ));
            }

            stored = Some(self.store_field(field).await?);
        }

        let blob = stored.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;
        self.register_and_enqueue(blob).await
    }

    /// Ingest a file from any byte source.
    pub async fn ingest_reader(
        &self,
        filename: impl Into<String>,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<UploadReceipt, AppError> {
        let id = Uuid::new_v4();
        let storage_key = file_storage_key(id);
        let size_bytes = self.storage.upload_stream(&storage_key, reader).await?;

        self.register_and_enqueue(StoredBlob {
            id,
            filename: filename.into(),
            storage_key,
            size_bytes,
        })
        .await
    }

    async fn store_field(&self, field: Field<'_>) -> Result<StoredBlob, AppError> {
        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "unknown".to_string());
        let id = Uuid::new_v4();
        let storage_key = file_storage_key(id);

        let body_failed = AtomicBool::new(false);
        let too_large = AtomicBool::new(false);
        let body = field.map(|chunk| {
            chunk.map_err(|e| {
                body_failed.store(true, Ordering::Relaxed);
                if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    too_large.store(true, Ordering::Relaxed);
                }
                io::Error::other(e)
            })
        });
        let mut reader = StreamReader::new(Box::pin(body));

        match self.storage.upload_stream(&storage_key, &mut reader).await {
            Ok(size_bytes) => Ok(StoredBlob {
                id,
                filename,
                storage_key,
                size_bytes,
            }),
            Err(_) if too_large.load(Ordering::Relaxed) => Err(AppError::PayloadTooLarge(
                "File exceeds the maximum upload size".to_string(),
            )),
            Err(e) if body_failed.load(Ordering::Relaxed) => Err(AppError::InvalidInput(format!(
                "Failed to read file data: {}",
                e
            ))),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self, blob), fields(file.id = %blob.id, file.size = blob.size_bytes))]
    async fn register_and_enqueue(&self, blob: StoredBlob) -> Result<UploadReceipt, AppError> {
        let record = match self
            .metadata
            .register(blob.id, &blob.filename, &blob.storage_key)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(error = %e, "Failed to register file, removing blob");
                self.discard_blob(&blob.storage_key).await;
                return Err(e.into());
            }
        };

        let job = ProcessingJob::new(blob.id, blob.storage_key, blob.filename);
        if let Err(e) = self.queue.submit(job, self.enqueue_budget).await {
            self.abandon(blob.id, &e).await;
            return Err(e.into());
        }

        tracing::info!(
            file_id = %record.id,
            filename = %record.filename,
            size_bytes = blob.size_bytes,
            "File accepted for processing"
        );

        Ok(UploadReceipt {
            id: record.id,
            filename: record.filename,
            status: record.status,
        })
    }

    /// Drive a registered record whose job was never queued to `failed`.
    async fn abandon(&self, id: Uuid, cause: &JobQueueError) {
        let transition = StatusTransition::Failed {
            reason: format!("not queued for processing: {}", cause),
        };
        if let Err(e) = self.metadata.transition_status(id, transition).await {
            tracing::error!(
                file_id = %id,
                error = %e,
                "Failed to mark unqueued file as failed"
            );
        }
    }

    async fn discard_blob(&self, storage_key: &str) {
        if let Err(e) = self.storage.delete(storage_key).await {
            tracing::warn!(key = %storage_key, error = %e, "Failed to remove orphaned blob");
        }
    }
}

fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("File exceeds the maximum upload size".to_string())
    } else {
        AppError::InvalidInput(format!("{}: {}", context, e))
    }
}
