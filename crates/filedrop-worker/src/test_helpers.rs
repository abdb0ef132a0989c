//! Storage and metadata doubles for pipeline and pool tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use filedrop_core::models::{FileMetadata, StatusTransition};
use filedrop_core::StorageBackend;
use filedrop_db::{MetadataStore, MetadataStoreResult};
use filedrop_storage::{ByteStream, Storage, StorageError, StorageResult};
use tokio::io::AsyncRead;
use uuid::Uuid;

#[derive(Clone)]
enum Behavior {
    Chunked { content: Bytes, chunk_size: usize },
    FailAfter { good_chunks: usize },
    Slow { delay: Duration },
    Panic,
}

/// Read-only blob store that serves the same scripted contents for every key.
#[derive(Clone)]
pub struct FlakyStorage {
    behavior: Behavior,
}

impl FlakyStorage {
    pub fn chunked(content: Vec<u8>, chunk_size: usize) -> Self {
        Self {
            behavior: Behavior::Chunked {
                content: Bytes::from(content),
                chunk_size: chunk_size.max(1),
            },
        }
    }

    /// Yields `good_chunks` chunks, then an error.
    pub fn failing_after(good_chunks: usize) -> Self {
        Self {
            behavior: Behavior::FailAfter { good_chunks },
        }
    }

    /// Waits `delay` before yielding a small blob.
    pub fn slow(delay: Duration) -> Self {
        Self {
            behavior: Behavior::Slow { delay },
        }
    }

    pub fn panicking() -> Self {
        Self {
            behavior: Behavior::Panic,
        }
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn upload(&self, _storage_key: &str, _data: Vec<u8>) -> StorageResult<u64> {
        Err(StorageError::BackendError("read-only".to_string()))
    }

    async fn upload_stream(
        &self,
        _storage_key: &str,
        _reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<u64> {
        Err(StorageError::BackendError("read-only".to_string()))
    }

    async fn download_stream(&self, _storage_key: &str) -> StorageResult<ByteStream> {
        match self.behavior.clone() {
            Behavior::Chunked {
                content,
                chunk_size,
            } => {
                let chunks: Vec<Result<Bytes, StorageError>> = content
                    .chunks(chunk_size)
                    .map(|c| Ok(Bytes::copy_from_slice(c)))
                    .collect();
                Ok(Box::pin(futures::stream::iter(chunks)))
            }
            Behavior::FailAfter { good_chunks } => {
                let mut items: Vec<Result<Bytes, StorageError>> = (0..good_chunks)
                    .map(|_| Ok(Bytes::from_static(b"chunk")))
                    .collect();
                items.push(Err(StorageError::DownloadFailed(
                    "connection reset".to_string(),
                )));
                Ok(Box::pin(futures::stream::iter(items)))
            }
            Behavior::Slow { delay } => {
                tokio::time::sleep(delay).await;
                Ok(Box::pin(futures::stream::iter(vec![Ok(Bytes::from_static(
                    b"slow",
                ))])))
            }
            Behavior::Panic => panic!("storage backend exploded"),
        }
    }

    async fn delete(&self, _storage_key: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn exists(&self, _storage_key: &str) -> StorageResult<bool> {
        Ok(true)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Wraps a store and counts `transition_status` calls.
pub struct CountingMetadataStore<S> {
    inner: S,
    transitions: Arc<AtomicUsize>,
}

impl<S> CountingMetadataStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            transitions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn transition_calls(&self) -> usize {
        self.transitions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: MetadataStore> MetadataStore for CountingMetadataStore<S> {
    async fn register(
        &self,
        id: Uuid,
        filename: &str,
        storage_key: &str,
    ) -> MetadataStoreResult<FileMetadata> {
        self.inner.register(id, filename, storage_key).await
    }

    async fn transition_status(
        &self,
        id: Uuid,
        transition: StatusTransition,
    ) -> MetadataStoreResult<FileMetadata> {
        self.transitions.fetch_add(1, Ordering::SeqCst);
        self.inner.transition_status(id, transition).await
    }

    async fn get(&self, id: Uuid) -> MetadataStoreResult<Option<FileMetadata>> {
        self.inner.get(id).await
    }

    async fn list_all(&self) -> MetadataStoreResult<Vec<FileMetadata>> {
        self.inner.list_all().await
    }

    async fn ping(&self) -> MetadataStoreResult<()> {
        self.inner.ping().await
    }
}
