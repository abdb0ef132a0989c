//! Asynchronous file processing for filedrop.
//!
//! Uploads are turned into [`ProcessingJob`]s and pushed onto a bounded [`JobQueue`].
//! A fixed [`WorkerPool`] drains the queue, running each job through the
//! [`ProcessingPipeline`] which hashes the blob and completes the metadata record.
//!
//! Shutdown: [`WorkerPool::shutdown`] closes the queue, lets workers finish what was
//! already accepted and waits a bounded time for the in-flight count to reach zero.
//!
//! [`ProcessingJob`]: filedrop_core::models::ProcessingJob

pub mod error;
pub mod pipeline;
pub mod pool;
pub mod queue;
pub mod tracker;

#[cfg(test)]
mod test_helpers;

pub use error::{JobQueueError, PipelineError, WorkerError};
pub use pipeline::{extension_of, ProcessingPipeline};
pub use pool::{ShutdownOutcome, WorkerPool};
pub use queue::{JobQueue, QueuedJob};
pub use tracker::{InFlightGuard, InFlightTracker};
