use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting permit pool bounding in-flight executors.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    permits: Arc<Semaphore>,
    counters: Arc<GateCounters>,
}

#[derive(Debug, Default)]
struct GateCounters {
    outstanding: AtomicUsize,
    peak: AtomicUsize,
}

/// Held for the lifetime of one executor task.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<GateCounters>,
}

impl ConcurrencyGate {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            counters: Arc::new(GateCounters::default()),
        }
    }

    /// Waits for a free permit. `None` if the semaphore was closed.
    pub async fn acquire(&self) -> Option<GatePermit> {
        let permit = Arc::clone(&self.permits).acquire_owned().await.ok()?;
        let outstanding = self
            .counters
            .outstanding
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1);
        self.counters.peak.fetch_max(outstanding, Ordering::AcqRel);
        Some(GatePermit {
            _permit: permit,
            counters: Arc::clone(&self.counters),
        })
    }

    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.counters.outstanding.load(Ordering::Acquire)
    }

    /// High-water mark of outstanding permits.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::Acquire)
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        let outstanding = &self.counters.outstanding;
        loop {
            let current = outstanding.load(Ordering::Acquire);
            let Some(next) = current.checked_sub(1) else {
                break;
            };
            if outstanding
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
        }
    }
}
