use async_trait::async_trait;
use filedrop_core::models::{FileMetadata, StatusTransition};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{MetadataStore, MetadataStoreError, MetadataStoreResult};

/// Metadata store kept in process memory. Clones share the same records.
#[derive(Clone, Default)]
pub struct InMemoryMetadataStore {
    records: Arc<RwLock<HashMap<Uuid, FileMetadata>>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn register(
        &self,
        id: Uuid,
        filename: &str,
        storage_key: &str,
    ) -> MetadataStoreResult<FileMetadata> {
        let mut records = self.records.write().await;
        if records.contains_key(&id) {
            return Err(MetadataStoreError::DuplicateId(id));
        }
        let record =
            FileMetadata::new_processing(id, filename.to_string(), storage_key.to_string());
        records.insert(id, record.clone());
        Ok(record)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        transition: StatusTransition,
    ) -> MetadataStoreResult<FileMetadata> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or(MetadataStoreError::NotFound(id))?;
        if record.status.is_terminal() {
            return Err(MetadataStoreError::AlreadyTerminal {
                id,
                status: record.status,
            });
        }
        record.apply(&transition);
        Ok(record.clone())
    }

    async fn get(&self, id: Uuid) -> MetadataStoreResult<Option<FileMetadata>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list_all(&self) -> MetadataStoreResult<Vec<FileMetadata>> {
        let mut all: Vec<FileMetadata> = self.records.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn ping(&self) -> MetadataStoreResult<()> {
        Ok(())
    }
}
