use std::sync::Arc;
use std::time::Instant;

use filedrop_core::models::{FileDigest, ProcessingJob, StatusTransition};
use filedrop_db::{MetadataStore, MetadataStoreError};
use filedrop_storage::Storage;
use futures::StreamExt;
use sha2::{Digest, Sha256};

use crate::error::PipelineError;

/// Hashes a job's blob and records the result on its metadata record.
#[derive(Clone)]
pub struct ProcessingPipeline {
    storage: Arc<dyn Storage>,
    metadata: Arc<dyn MetadataStore>,
}

impl ProcessingPipeline {
    pub fn new(storage: Arc<dyn Storage>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self { storage, metadata }
    }

    /// Compute the digest and complete the record with exactly one metadata update.
    #[tracing::instrument(skip(self, job), fields(file.id = %job.file_id, storage.key = %job.storage_key))]
    pub async fn process(&self, job: &ProcessingJob) -> Result<FileDigest, PipelineError> {
        let start = Instant::now();

        let digest = self.compute_digest(job).await?;

        self.metadata
            .transition_status(job.file_id, StatusTransition::Completed(digest.clone()))
            .await
            .map_err(|source| PipelineError::MetadataUpdateFailed {
                file_id: job.file_id,
                source,
            })?;

        tracing::info!(
            file_id = %job.file_id,
            sha256 = %digest.sha256,
            size_bytes = digest.size_bytes,
            extension = %digest.extension,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File processing completed"
        );

        Ok(digest)
    }

    /// Stream the blob through SHA-256, counting bytes as they pass.
    pub async fn compute_digest(&self, job: &ProcessingJob) -> Result<FileDigest, PipelineError> {
        let mut stream = self
            .storage
            .download_stream(&job.storage_key)
            .await
            .map_err(|source| PipelineError::BlobUnreadable {
                key: job.storage_key.clone(),
                source,
            })?;

        let mut hasher = Sha256::new();
        let mut size_bytes: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| PipelineError::HashComputationFailed {
                key: job.storage_key.clone(),
                source,
            })?;
            hasher.update(&chunk);
            size_bytes += chunk.len() as u64;
        }

        Ok(FileDigest {
            sha256: hex::encode(hasher.finalize()),
            size_bytes,
            extension: extension_of(&job.original_filename),
        })
    }

    /// Drive a job's record to `failed`. Errors are logged, not returned.
    pub async fn record_failure(&self, job: &ProcessingJob, reason: String) {
        match self
            .metadata
            .transition_status(job.file_id, StatusTransition::Failed { reason })
            .await
        {
            Ok(_) => {
                tracing::info!(file_id = %job.file_id, "File marked as failed");
            }
            Err(MetadataStoreError::AlreadyTerminal { status, .. }) => {
                tracing::debug!(
                    file_id = %job.file_id,
                    status = %status,
                    "Record already terminal, not marking failed"
                );
            }
            Err(e) => {
                tracing::error!(
                    file_id = %job.file_id,
                    error = %e,
                    "Failed to mark file as failed; record stays processing"
                );
            }
        }
    }
}

/// Extension of an original filename: the last `.`-delimited suffix of its final path
/// component, dot included, or `""` when there is none.
///
/// `"a.tar.gz"` gives `".gz"`, `"noext"` gives `""` and `".hidden"` gives `".hidden"`.
pub fn extension_of(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    match name.rfind('.') {
        Some(idx) => name[idx..].to_string(),
        None => String::new(),
    }
}
