//! Bounded FIFO of processing jobs shared by producers and the worker pool.
//!
//! A full queue makes producers wait (back-pressure) instead of dropping jobs. Once
//! [`JobQueue::close`] is called every new enqueue fails with `QueueClosed`, producers
//! still waiting for room are released with the same error, and consumers keep
//! receiving the already-queued jobs until the queue is empty.

use std::time::Duration;

use filedrop_core::models::ProcessingJob;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::error::JobQueueError;
use crate::tracker::{InFlightGuard, InFlightTracker};

/// A job as handed to a consumer. Holds the job's in-flight slot until dropped.
#[derive(Debug)]
pub struct QueuedJob {
    job: ProcessingJob,
    _guard: InFlightGuard,
}

impl QueuedJob {
    pub fn job(&self) -> &ProcessingJob {
        &self.job
    }

    /// Take the job out, releasing its in-flight slot.
    pub fn into_job(self) -> ProcessingJob {
        self.job
    }
}

pub struct JobQueue {
    sender: RwLock<Option<mpsc::Sender<QueuedJob>>>,
    receiver: Mutex<mpsc::Receiver<QueuedJob>>,
    closed: CancellationToken,
    tracker: InFlightTracker,
    capacity: usize,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` jobs (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);

        tracing::info!(capacity = capacity, "Job queue initialized with bounded channel");

        Self {
            sender: RwLock::new(Some(tx)),
            receiver: Mutex::new(rx),
            closed: CancellationToken::new(),
            tracker: InFlightTracker::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Jobs accepted and not yet finished, queued or running
    pub fn in_flight(&self) -> usize {
        self.tracker.in_flight()
    }

    pub fn tracker(&self) -> &InFlightTracker {
        &self.tracker
    }

    /// Append a job, waiting while the queue is full.
    #[tracing::instrument(skip(self, job), fields(file.id = %job.file_id))]
    pub async fn enqueue(&self, job: ProcessingJob) -> Result<(), JobQueueError> {
        if self.closed.is_cancelled() {
            return Err(JobQueueError::QueueClosed);
        }

        let sender = match self.sender.read().await.as_ref() {
            Some(sender) => sender.clone(),
            None => return Err(JobQueueError::QueueClosed),
        };

        let queued = QueuedJob {
            job,
            _guard: self.tracker.acquire(),
        };

        // A rejected or abandoned send drops `queued`, releasing its in-flight slot.
        tokio::select! {
            biased;
            result = sender.send(queued) => result.map_err(|_| JobQueueError::QueueClosed),
            _ = self.closed.cancelled() => {
                tracing::debug!("Job queue closed while waiting for capacity");
                Err(JobQueueError::QueueClosed)
            }
        }
    }

    /// Enqueue within `budget`; fails with `BackPressure` if the queue stays full that long.
    pub async fn submit(&self, job: ProcessingJob, budget: Duration) -> Result<(), JobQueueError> {
        let file_id = job.file_id;
        match tokio::time::timeout(budget, self.enqueue(job)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    file_id = %file_id,
                    budget_ms = budget.as_millis() as u64,
                    capacity = self.capacity,
                    "Job queue is full, rejecting job"
                );
                Err(JobQueueError::BackPressure { waited: budget })
            }
        }
    }

    /// Next job in FIFO order, or `None` once the queue is closed and empty.
    pub async fn dequeue(&self) -> Option<QueuedJob> {
        self.receiver.lock().await.recv().await
    }

    /// Stop accepting jobs. Already-queued jobs stay available to `dequeue`.
    pub async fn close(&self) {
        self.closed.cancel();
        if self.sender.write().await.take().is_some() {
            tracing::info!(in_flight = self.in_flight(), "Job queue closed");
        }
    }

    /// Resolve once every accepted job has finished.
    pub async fn wait_idle(&self) {
        self.tracker.wait_idle().await
    }
}
