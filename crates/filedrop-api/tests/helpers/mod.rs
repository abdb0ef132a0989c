//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p filedrop-api`. Every test app uses the
//! in-memory metadata store and blob storage, so no external services are needed.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use filedrop_api::constants;
use filedrop_api::setup::routes;
use filedrop_api::state::AppState;
use filedrop_core::models::{FileMetadata, ProcessingStatus, StatusTransition};
use filedrop_core::Config;
use filedrop_db::{InMemoryMetadataStore, MetadataStore, MetadataStoreResult};
use filedrop_storage::{MemoryStorage, Storage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server plus direct handles on the shared state.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// POST one file as the `file` multipart field.
    pub async fn upload(&self, filename: &str, content: &[u8]) -> TestResponse {
        let part = Part::bytes(bytes::Bytes::copy_from_slice(content))
            .file_name(filename.to_string())
            .mime_type("application/octet-stream");
        self.server
            .post(&api_path("/files"))
            .multipart(MultipartForm::new().add_part("file", part))
            .await
    }

    /// Poll the record until it leaves `processing`.
    pub async fn wait_for_terminal(&self, id: Uuid) -> serde_json::Value {
        for _ in 0..200 {
            let response = self.server.get(&api_path(&format!("/files/{}", id))).await;
            let body: serde_json::Value = response.json();
            if body["status"] != "processing" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("file {} still processing after 2s", id);
    }
}

fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("METADATA_BACKEND", "memory"),
        ("STORAGE_BACKEND", "memory"),
        ("WORKER_COUNT", "2"),
        ("JOB_QUEUE_CAPACITY", "16"),
        ("ENQUEUE_TIMEOUT_MS", "500"),
        ("MAX_FILE_SIZE_MB", "1"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }
    Config::from_lookup(|key| vars.get(key).cloned()).expect("valid test config")
}

/// Setup a test app with in-memory backends.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[], Arc::new(InMemoryMetadataStore::new())).await
}

/// Setup a test app with config overrides and a specific metadata store.
pub async fn setup_test_app_with(
    overrides: &[(&str, &str)],
    metadata: Arc<dyn MetadataStore>,
) -> TestApp {
    let config = test_config(overrides);
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let state = Arc::new(AppState::new(config.clone(), metadata, storage));

    let app = routes::setup_routes(&config, state.clone())
        .await
        .expect("Failed to build routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp { server, state }
}

/// Metadata store whose `completed` transitions wait for a permit, so tests can hold
/// workers mid-job.
pub struct GatedMetadataStore {
    inner: InMemoryMetadataStore,
    gate: Arc<Semaphore>,
}

impl GatedMetadataStore {
    pub fn new() -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let store = Arc::new(Self {
            inner: InMemoryMetadataStore::new(),
            gate: gate.clone(),
        });
        (store, gate)
    }
}

#[async_trait]
impl MetadataStore for GatedMetadataStore {
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
        if transition.target_status() == ProcessingStatus::Completed {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
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
