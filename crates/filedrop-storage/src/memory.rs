//! In-memory blob storage for development and tests.

use crate::keys::validate_key;
use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::RwLock;

/// Chunk size used when replaying a blob through `download_stream`.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Blob store holding every object in a shared map. Clones share the same contents.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    blobs: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<u64> {
        validate_key(storage_key)?;
        let size = data.len() as u64;
        self.blobs
            .write()
            .await
            .insert(storage_key.to_string(), Bytes::from(data));
        tracing::debug!(key = %storage_key, size_bytes = size, "Memory storage upload");
        Ok(size)
    }

    async fn upload_stream(
        &self,
        storage_key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<u64> {
        validate_key(storage_key)?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read upload stream: {}", e))
        })?;
        self.upload(storage_key, data).await
    }

    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        validate_key(storage_key)?;
        let blob = self
            .blobs
            .read()
            .await
            .get(storage_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))?;

        let chunks: Vec<Result<Bytes, StorageError>> = (0..blob.len())
            .step_by(STREAM_CHUNK_SIZE)
            .map(|start| {
                let end = (start + STREAM_CHUNK_SIZE).min(blob.len());
                Ok(blob.slice(start..end))
            })
            .collect();

        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        validate_key(storage_key)?;
        self.blobs.write().await.remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        validate_key(storage_key)?;
        Ok(self.blobs.read().await.contains_key(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn stream_download_reassembles_large_blob() {
        let storage = MemoryStorage::new();
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        storage.upload("files/big", data.clone()).await.unwrap();

        let mut stream = storage.download_stream("files/big").await.unwrap();
        let mut chunks = 0;
        let mut downloaded = Vec::new();
        while let Some(chunk) = stream.next().await {
            downloaded.extend_from_slice(&chunk.unwrap());
            chunks += 1;
        }
        assert_eq!(downloaded, data);
        assert!(chunks > 1);
    }

    #[tokio::test]
    async fn empty_blob_streams_no_chunks() {
        let storage = MemoryStorage::new();
        storage.upload("files/empty", Vec::new()).await.unwrap();
        let stream = storage.download_stream("files/empty").await.unwrap();
        assert_eq!(stream.count().await, 0);
        assert!(storage.exists("files/empty").await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_blob_and_missing_is_not_found() {
        let storage = MemoryStorage::new();
        let mut reader = std::io::Cursor::new(b"abc".to_vec());
        assert_eq!(storage.upload_stream("files/a", &mut reader).await.unwrap(), 3);
        assert!(storage.exists("files/a").await.unwrap());

        storage.delete("files/a").await.unwrap();
        assert!(storage.is_empty().await);
        assert!(matches!(
            storage.download_stream("files/a").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn invalid_keys_are_rejected() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.upload("../escape", vec![1]).await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
