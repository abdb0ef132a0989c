//! Application state shared by handlers.

use std::sync::Arc;

use filedrop_core::Config;
use filedrop_db::MetadataStore;
use filedrop_storage::Storage;
use filedrop_worker::{JobQueue, ProcessingPipeline, WorkerPool};

use crate::services::IngestionGateway;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub metadata: Arc<dyn MetadataStore>,
    pub storage: Arc<dyn Storage>,
    pub queue: Arc<JobQueue>,
    pub workers: Arc<WorkerPool>,
    pub ingestion: IngestionGateway,
}

impl AppState {
    /// Wire the job queue, worker pool and ingestion gateway around the given stores.
    ///
    /// Spawns the workers, so it must run inside a Tokio runtime.
    pub fn new(config: Config, metadata: Arc<dyn MetadataStore>, storage: Arc<dyn Storage>) -> Self {
        let queue = Arc::new(JobQueue::new(config.job_queue_capacity));
        let pipeline = ProcessingPipeline::new(storage.clone(), metadata.clone());
        let workers = Arc::new(WorkerPool::start(
            config.worker_count,
            queue.clone(),
            pipeline,
        ));
        let ingestion = IngestionGateway::new(
            storage.clone(),
            metadata.clone(),
            queue.clone(),
            config.enqueue_timeout(),
        );

        Self {
            config,
            metadata,
            storage,
            queue,
            workers,
            ingestion,
        }
    }
}
