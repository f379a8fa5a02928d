//! Per-kind cron scheduling: one `tokio::time::interval` loop per kind,
//! following a monitor-analyze-plan-execute control loop shape generalized
//! from one global loop to N per-kind loops.
//!
//! Missed ticks never accumulate: a firing that lands while the previous
//! tick is still running sets a `pending` flag instead of spawning a second
//! concurrent tick for the same kind, queuing at most one follow-up and
//! dropping further triggers until drain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use site_agent_core::ResourceKind;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::ReconcileEngine;

struct KindCron {
    kind: ResourceKind,
    interval: Duration,
    in_flight: Arc<AtomicBool>,
    pending: Arc<AtomicBool>,
}

/// Owns one cron loop per registered kind; `run` blocks until `cancel` fires.
pub struct CronScheduler {
    engine: Arc<ReconcileEngine>,
    schedules: Vec<KindCron>,
}

impl CronScheduler {
    /// `intervals` is `(kind, interval)` for every kind that should be
    /// reconciled on a cron — `Tray`/`Rack` have no mutating RPC and are
    /// typically omitted by the caller, since their only cron-driven work is
    /// the discovery publisher each manager's own `register_cron` already
    /// describes independently of this scheduler.
    pub fn new(engine: Arc<ReconcileEngine>, intervals: Vec<(ResourceKind, Duration)>) -> Self {
        let schedules = intervals
            .into_iter()
            .map(|(kind, interval)| KindCron {
                kind,
                interval,
                in_flight: Arc::new(AtomicBool::new(false)),
                pending: Arc::new(AtomicBool::new(false)),
            })
            .collect();
        Self { engine, schedules }
    }

    /// Spawns one task per kind and waits for all of them to stop.
    pub async fn run(self, cancel: CancellationToken) {
        let mut handles = Vec::with_capacity(self.schedules.len());
        for schedule in self.schedules {
            let engine = self.engine.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(run_kind_cron(engine, schedule, cancel)));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn run_kind_cron(engine: Arc<ReconcileEngine>, schedule: KindCron, cancel: CancellationToken) {
    let KindCron { kind, interval, in_flight, pending } = schedule;
    info!(kind = kind.as_str(), interval_secs = interval.as_secs(), "reconcile cron starting");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(kind = kind.as_str(), "reconcile cron stopping");
                return;
            }
            _ = ticker.tick() => {
                if in_flight.swap(true, Ordering::SeqCst) {
                    // Previous tick for this kind is still running; coalesce
                    // this firing into a single pending follow-up instead of
                    // running a second tick concurrently.
                    pending.store(true, Ordering::SeqCst);
                    debug!(kind = kind.as_str(), "reconcile tick already in flight, coalescing");
                    continue;
                }
                let engine = engine.clone();
                let in_flight = in_flight.clone();
                let pending = pending.clone();
                tokio::spawn(async move { drain_ticks(engine, kind, in_flight, pending).await });
            }
        }
    }
}

/// Runs one tick, then — if a firing coalesced while it ran — runs exactly
/// one more immediately, repeating until no follow-up is pending.
async fn drain_ticks(engine: Arc<ReconcileEngine>, kind: ResourceKind, in_flight: Arc<AtomicBool>, pending: Arc<AtomicBool>) {
    loop {
        engine.tick(kind).await;
        if pending.swap(false, Ordering::SeqCst) {
            continue;
        }
        in_flight.store(false, Ordering::SeqCst);
        return;
    }
}
