//! Count of accepted jobs that have not finished yet.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    idle: Notify,
}

/// Shared in-flight counter. Incremented when a job is accepted, decremented when the
/// job's [`InFlightGuard`] is dropped.
#[derive(Clone, Default)]
pub struct InFlightTracker {
    counters: Arc<Counters>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one more in-flight job.
    pub fn acquire(&self) -> InFlightGuard {
        let now = self.counters.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.counters.peak.fetch_max(now, Ordering::AcqRel);
        InFlightGuard {
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::Acquire)
    }

    /// Highest in-flight count observed so far
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::Acquire)
    }

    /// Resolve once no job is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.counters.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a decrement in between is not missed.
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Releases one in-flight slot when dropped, whether the job completed, failed,
/// panicked, or was never delivered.
#[must_use = "dropping the guard immediately marks the job finished"]
pub struct InFlightGuard {
    counters: Arc<Counters>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.counters.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.counters.idle.notify_waiters();
        }
    }
}

impl std::fmt::Debug for InFlightGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightGuard").finish_non_exhaustive()
    }
}
