use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::WorkerError;
use crate::pipeline::ProcessingPipeline;
use crate::queue::{JobQueue, QueuedJob};

/// How a bounded shutdown ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every accepted job finished
    Drained,
    /// The timeout elapsed with `pending` jobs still queued or running
    TimedOut { pending: usize },
}

impl ShutdownOutcome {
    pub fn into_result(self) -> Result<(), WorkerError> {
        match self {
            ShutdownOutcome::Drained => Ok(()),
            ShutdownOutcome::TimedOut { pending } => Err(WorkerError::ShutdownTimeout { pending }),
        }
    }
}

/// Fixed set of workers draining a [`JobQueue`].
pub struct WorkerPool {
    queue: Arc<JobQueue>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl WorkerPool {
    /// Spawn `worker_count` workers (at least 1) on the current runtime.
    pub fn start(worker_count: usize, queue: Arc<JobQueue>, pipeline: ProcessingPipeline) -> Self {
        let worker_count = worker_count.max(1);

        let handles = (0..worker_count)
            .map(|worker_id| {
                let queue = Arc::clone(&queue);
                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    Self::run_worker(worker_id, queue, pipeline).await;
                })
            })
            .collect();

        tracing::info!(
            worker_count = worker_count,
            queue_capacity = queue.capacity(),
            "Worker pool started"
        );

        Self {
            queue,
            handles: Mutex::new(handles),
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    async fn run_worker(worker_id: usize, queue: Arc<JobQueue>, pipeline: ProcessingPipeline) {
        tracing::debug!(worker_id = worker_id, "Worker started");

        while let Some(queued) = queue.dequeue().await {
            Self::handle_job(worker_id, &pipeline, &queued).await;
            // Dropping the job releases its in-flight slot
            drop(queued);
        }

        tracing::debug!(worker_id = worker_id, "Worker stopped, queue closed and empty");
    }

    async fn handle_job(worker_id: usize, pipeline: &ProcessingPipeline, queued: &QueuedJob) {
        let job = queued.job();

        let outcome = AssertUnwindSafe(pipeline.process(job)).catch_unwind().await;

        match outcome {
            Ok(Ok(_digest)) => {}
            Ok(Err(e)) => {
                tracing::error!(
                    worker_id = worker_id,
                    file_id = %job.file_id,
                    filename = %job.original_filename,
                    error = %e,
                    "File processing failed, dropping job"
                );
                if e.record_still_processing() {
                    pipeline.record_failure(job, e.to_string()).await;
                }
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(
                    worker_id = worker_id,
                    file_id = %job.file_id,
                    panic = %message,
                    "File processing panicked, dropping job"
                );
                pipeline
                    .record_failure(job, format!("processing panicked: {}", message))
                    .await;
            }
        }
    }

    /// Close the queue, let workers drain it, and wait up to `timeout` for every
    /// accepted job to finish. Running jobs are never interrupted.
    pub async fn shutdown(&self, timeout: Duration) -> ShutdownOutcome {
        tracing::info!(
            in_flight = self.queue.in_flight(),
            timeout_secs = timeout.as_secs_f64(),
            "Shutting down worker pool"
        );
        self.queue.close().await;

        let drained = tokio::time::timeout(timeout, async {
            self.queue.wait_idle().await;
            let handles = std::mem::take(&mut *self.handles.lock().await);
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "Worker task ended abnormally");
                }
            }
        })
        .await;

        match drained {
            Ok(()) => {
                tracing::info!("Worker pool drained");
                ShutdownOutcome::Drained
            }
            Err(_) => {
                let pending = self.queue.in_flight();
                tracing::warn!(
                    pending = pending,
                    timeout_secs = timeout.as_secs_f64(),
                    "Worker pool shutdown timed out, abandoning in-flight jobs"
                );
                ShutdownOutcome::TimedOut { pending }
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FlakyStorage;
    use filedrop_core::models::{ProcessingJob, ProcessingStatus};
    use filedrop_db::{InMemoryMetadataStore, MetadataStore};
    use filedrop_storage::{MemoryStorage, Storage};
    use uuid::Uuid;

    async fn wait_for_status(
        metadata: &InMemoryMetadataStore,
        id: Uuid,
        status: ProcessingStatus,
    ) -> bool {
        for _ in 0..200 {
            if let Some(record) = metadata.get(id).await.unwrap() {
                if record.status == status {
                    return true;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn more_jobs_than_workers_all_complete() {
        let storage = MemoryStorage::new();
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let queue = Arc::new(JobQueue::new(4));
        let pipeline = ProcessingPipeline::new(Arc::new(storage.clone()), metadata.clone());
        let pool = WorkerPool::start(2, Arc::clone(&queue), pipeline);

        let mut ids = Vec::new();
        for i in 0..12 {
            let id = Uuid::new_v4();
            let key = filedrop_storage::file_storage_key(id);
            storage.upload(&key, vec![i as u8; i * 10]).await.unwrap();
            metadata.register(id, &format!("f{i}.bin"), &key).await.unwrap();
            queue
                .enqueue(ProcessingJob::new(id, key, format!("f{i}.bin")))
                .await
                .unwrap();
            ids.push(id);
        }

        assert_eq!(pool.shutdown(Duration::from_secs(5)).await, ShutdownOutcome::Drained);
        assert_eq!(queue.in_flight(), 0);
        assert!(queue.tracker().peak() <= 12);

        for id in ids {
            let record = metadata.get(id).await.unwrap().unwrap();
            assert_eq!(record.status, ProcessingStatus::Completed);
            assert_eq!(record.extension.as_deref(), Some(".bin"));
        }
    }

    #[tokio::test]
    async fn failed_job_marks_record_failed_and_pool_keeps_going() {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let queue = Arc::new(JobQueue::new(8));
        let pipeline =
            ProcessingPipeline::new(Arc::new(FlakyStorage::failing_after(1)), metadata.clone());
        let pool = WorkerPool::start(1, Arc::clone(&queue), pipeline);

        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        for id in [first, second] {
            metadata.register(id, "a.txt", "files/x").await.unwrap();
            queue
                .enqueue(ProcessingJob::new(id, "files/x", "a.txt"))
                .await
                .unwrap();
        }

        assert!(wait_for_status(&metadata, first, ProcessingStatus::Failed).await);
        assert!(wait_for_status(&metadata, second, ProcessingStatus::Failed).await);
        let record = metadata.get(first).await.unwrap().unwrap();
        assert!(record.failure_reason.unwrap().contains("hashing blob"));
        assert!(record.sha256.is_none());

        assert_eq!(pool.shutdown(Duration::from_secs(2)).await, ShutdownOutcome::Drained);
    }

    #[tokio::test]
    async fn panicking_pipeline_is_isolated_per_job() {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let queue = Arc::new(JobQueue::new(8));
        let pipeline =
            ProcessingPipeline::new(Arc::new(FlakyStorage::panicking()), metadata.clone());
        let pool = WorkerPool::start(1, Arc::clone(&queue), pipeline);

        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            metadata.register(*id, "a.txt", "files/x").await.unwrap();
            queue
                .enqueue(ProcessingJob::new(*id, "files/x", "a.txt"))
                .await
                .unwrap();
        }

        // The single worker survives each panic and reaches every job
        for id in &ids {
            assert!(wait_for_status(&metadata, *id, ProcessingStatus::Failed).await);
        }
        assert_eq!(pool.shutdown(Duration::from_secs(2)).await, ShutdownOutcome::Drained);
        assert_eq!(queue.in_flight(), 0);
    }

    #[tokio::test]
    async fn shutdown_with_generous_timeout_drains_in_flight_jobs() {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let queue = Arc::new(JobQueue::new(8));
        let pipeline = ProcessingPipeline::new(
            Arc::new(FlakyStorage::slow(Duration::from_millis(50))),
            metadata.clone(),
        );
        let pool = WorkerPool::start(3, Arc::clone(&queue), pipeline);

        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            metadata.register(*id, "slow.dat", "files/x").await.unwrap();
            queue
                .enqueue(ProcessingJob::new(*id, "files/x", "slow.dat"))
                .await
                .unwrap();
        }

        let outcome = pool.shutdown(Duration::from_secs(5)).await;
        assert_eq!(outcome, ShutdownOutcome::Drained);
        assert!(outcome.into_result().is_ok());
        assert_eq!(queue.in_flight(), 0);
        for id in &ids {
            let record = metadata.get(*id).await.unwrap().unwrap();
            assert_eq!(record.status, ProcessingStatus::Completed);
        }

        let late = queue
            .enqueue(ProcessingJob::new(Uuid::new_v4(), "files/x", "late"))
            .await;
        assert_eq!(late, Err(crate::JobQueueError::QueueClosed));
    }

    #[tokio::test]
    async fn shutdown_times_out_when_jobs_outlast_budget() {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let queue = Arc::new(JobQueue::new(8));
        let pipeline = ProcessingPipeline::new(
            Arc::new(FlakyStorage::slow(Duration::from_secs(2))),
            metadata.clone(),
        );
        let pool = WorkerPool::start(1, Arc::clone(&queue), pipeline);

        for _ in 0..3 {
            let id = Uuid::new_v4();
            metadata.register(id, "slow.dat", "files/x").await.unwrap();
            queue
                .enqueue(ProcessingJob::new(id, "files/x", "slow.dat"))
                .await
                .unwrap();
        }

        let started = std::time::Instant::now();
        let outcome = pool.shutdown(Duration::from_millis(100)).await;
        assert!(started.elapsed() < Duration::from_secs(1));

        match outcome {
            ShutdownOutcome::TimedOut { pending } => assert!(pending > 0),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(matches!(
            outcome.into_result(),
            Err(WorkerError::ShutdownTimeout { .. })
        ));
    }
}
