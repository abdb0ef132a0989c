//! Shared key generation and validation for storage backends.

use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

const FILES_PREFIX: &str = "files";

/// Storage key for an uploaded file: `files/{file_id}`.
pub fn file_storage_key(file_id: Uuid) -> String {
    format!("{}/{}", FILES_PREFIX, file_id)
}

/// Reject keys that are empty, absolute, or contain a parent-directory component.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.contains("..") || storage_key.starts_with('/') || storage_key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
