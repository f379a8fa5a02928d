//! `HealthCache` — the three-field health snapshot.
//!
//! Backed by a lock-free `ArcSwap` rather than a mutex-guarded map, since
//! reads (every `/readyz` poll, every dashboard refresh) vastly outnumber
//! writes (one per reconcile tick, one per gRPC call outcome).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use site_agent_core::{ComponentHealth, HealthSnapshot, HealthState};

/// Consecutive gRPC failures before `controller_connection_health` flips to
/// `Down`.
const FAILURE_THRESHOLD: u32 = 3;

pub struct HealthCache {
    snapshot: ArcSwap<HealthSnapshot>,
    consecutive_controller_failures: AtomicU32,
}

impl HealthCache {
    /// Created `Unknown` at startup, never destroyed.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            snapshot: ArcSwap::from_pointee(HealthSnapshot::all_unknown()),
            consecutive_controller_failures: AtomicU32::new(0),
        })
    }

    /// Single atomic load; callers never observe a snapshot with only some
    /// fields updated.
    pub fn snapshot(&self) -> HealthSnapshot {
        (**self.snapshot.load()).clone()
    }

    /// Set by the reconciler on every tick completion.
    pub fn update_inventory(&self, state: HealthState, message: impl Into<String>) {
        self.replace(|s| s.inventory_health = ComponentHealth::new(state, message.into()));
    }

    /// Set by the atomic gRPC client: `Up` on every successful call, `Down`
    /// once `FAILURE_THRESHOLD` consecutive failures accumulate. A success
    /// resets the streak immediately.
    pub fn record_controller_call(&self, succeeded: bool, message: impl Into<String>) {
        if succeeded {
            self.consecutive_controller_failures.store(0, Ordering::SeqCst);
            self.replace(|s| s.controller_connection_health = ComponentHealth::new(HealthState::Up, message.into()));
            return;
        }

        let failures = self.consecutive_controller_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= FAILURE_THRESHOLD {
            self.replace(|s| {
                s.controller_connection_health = ComponentHealth::new(HealthState::Down, message.into())
            });
        } else {
            self.replace(|s| {
                s.controller_connection_health = ComponentHealth::new(HealthState::Error, message.into())
            });
        }
    }

    /// Set by the external leader-election subsystem; this crate only
    /// stores what it is told.
    pub fn update_availability(&self, state: HealthState, message: impl Into<String>) {
        self.replace(|s| s.availability_health = ComponentHealth::new(state, message.into()));
    }

    fn replace(&self, f: impl FnOnce(&mut HealthSnapshot)) {
        let mut next = (**self.snapshot.load()).clone();
        f(&mut next);
        self.snapshot.store(Arc::new(next));
    }
}

impl Default for HealthCache {
    fn default() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(HealthSnapshot::all_unknown()),
            consecutive_controller_failures: AtomicU32::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_all_unknown() {
        let cache = HealthCache::new();
        let snap = cache.snapshot();
        assert_eq!(snap.inventory_health.state, HealthState::Unknown);
        assert_eq!(snap.controller_connection_health.state, HealthState::Unknown);
        assert_eq!(snap.availability_health.state, HealthState::Unknown);
    }

    #[test]
    fn three_consecutive_failures_flip_to_down() {
        let cache = HealthCache::new();
        cache.record_controller_call(false, "timeout");
        cache.record_controller_call(false, "timeout");
        assert_eq!(
            cache.snapshot().controller_connection_health.state,
            HealthState::Error
        );
        cache.record_controller_call(false, "timeout");
        assert_eq!(
            cache.snapshot().controller_connection_health.state,
            HealthState::Down
        );
    }

    #[test]
    fn a_success_resets_the_failure_streak() {
        let cache = HealthCache::new();
        cache.record_controller_call(false, "timeout");
        cache.record_controller_call(false, "timeout");
        cache.record_controller_call(true, "ok");
        assert_eq!(cache.snapshot().controller_connection_health.state, HealthState::Up);
        cache.record_controller_call(false, "timeout");
        assert_eq!(
            cache.snapshot().controller_connection_health.state,
            HealthState::Error
        );
    }

    #[test]
    fn inventory_and_controller_updates_do_not_clobber_each_other() {
        let cache = HealthCache::new();
        cache.update_inventory(HealthState::Up, "tick complete");
        cache.record_controller_call(true, "ok");
        let snap = cache.snapshot();
        assert_eq!(snap.inventory_health.state, HealthState::Up);
        assert_eq!(snap.controller_connection_health.state, HealthState::Up);
        assert_eq!(snap.availability_health.state, HealthState::Unknown);
    }
}
