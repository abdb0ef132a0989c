//! Filedrop Storage Library
//!
//! Blob storage abstraction for uploaded file contents, with a local filesystem
//! backend and an in-memory backend.
//!
//! # Storage key format
//!
//! Keys are derived from the file id only: `files/{file_id}`. The client-supplied
//! filename never becomes part of a key. Keys must not contain `..` or a leading `/`;
//! every backend validates them through the `keys` module.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use filedrop_core::StorageBackend;
pub use keys::file_storage_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
