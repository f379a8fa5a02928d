//! Per-kind activity counters, readable without locking.

use std::sync::atomic::{AtomicU64, Ordering};

/// Five monotonic counters tracked per [`crate::ResourceKind`] by the
/// orchestrator. Every field only ever moves forward via `fetch_add`, so a
/// reader never observes a torn update.
#[derive(Debug, Default)]
pub struct ActivityCounters {
    pub started: AtomicU64,
    pub activity_failed: AtomicU64,
    pub activity_succeeded: AtomicU64,
    pub publish_failed: AtomicU64,
    pub publish_succeeded: AtomicU64,
}

impl ActivityCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_activity_result(&self, succeeded: bool) {
        if succeeded {
            self.activity_succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.activity_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn record_publish_result(&self, succeeded: bool) {
        if succeeded {
            self.publish_succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.publish_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> ActivityCounterSnapshot {
        ActivityCounterSnapshot {
            started: self.started.load(Ordering::SeqCst),
            activity_failed: self.activity_failed.load(Ordering::SeqCst),
            activity_succeeded: self.activity_succeeded.load(Ordering::SeqCst),
            publish_failed: self.publish_failed.load(Ordering::SeqCst),
            publish_succeeded: self.publish_succeeded.load(Ordering::SeqCst),
        }
    }
}

/// A point-in-time read of [`ActivityCounters`], for metrics export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityCounterSnapshot {
    pub started: u64,
    pub activity_failed: u64,
    pub activity_succeeded: u64,
    pub publish_failed: u64,
    pub publish_succeeded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_only_move_forward() {
        let counters = ActivityCounters::new();
        counters.record_started();
        counters.record_activity_result(true);
        counters.record_activity_result(false);
        let snap = counters.snapshot();
        assert_eq!(snap.started, 1);
        assert_eq!(snap.activity_succeeded, 1);
        assert_eq!(snap.activity_failed, 1);
    }
}
