//! The uniform manager shape: `Init, RegisterSubscriber, RegisterPublisher,
//! RegisterCron, GetState`, plus the `activity` entry point the workflow
//! adapter dispatches into.
//!
//! Expressed as a trait object (`Arc<dyn ResourceManager>`) rather than an
//! enum-matched hierarchy: the *registry* is the dispatch table keyed by
//! the `ResourceKind` tag, and each manager is free to vary its internal
//! activity set without forcing every other kind's enum variant to grow in
//! lockstep.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use site_agent_core::{ActivityCounters, ResourceKind, SiteAgentResult, TransactionId};

/// Context threaded through every activity call: the idempotence key and
/// the workflow-supplied start-to-close deadline.
#[derive(Debug, Clone, Copy)]
pub struct ActivityContext {
    pub transaction_id: TransactionId,
    pub deadline: Duration,
}

/// One workflow name this manager subscribes to on the `site-subscribe`
/// queue.
#[derive(Debug, Clone)]
pub struct SubscriberRegistration {
    pub workflow_names: Vec<&'static str>,
}

/// A publisher workflow this manager can initiate to push discovered state
/// upstream, plus the cron interval that triggers it.
#[derive(Debug, Clone)]
pub struct PublisherRegistration {
    pub workflow_name: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct CronRegistration {
    pub default_interval: Duration,
}

#[async_trait]
pub trait ResourceManager: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Per-kind monotonic activity counters, exposed through the health
    /// surface.
    fn counters(&self) -> &ActivityCounters;

    /// A cloned handle to the same counters `counters()` borrows from, for
    /// `MetricsRegistry::register_kind` to hold onto past this call's
    /// return, wired once per kind at startup.
    fn counters_handle(&self) -> Arc<ActivityCounters>;

    /// Startup hook; the default no-op covers managers with nothing to warm
    /// up. A failure here is a fatal configuration error, never a
    /// retryable runtime condition.
    async fn init(&self) -> SiteAgentResult<()> {
        Ok(())
    }

    fn register_subscriber(&self) -> SubscriberRegistration;

    /// `None` for kinds with nothing to discover and publish upstream (rare;
    /// every kind here publishes discovered drift via the reconciler).
    fn register_publisher(&self) -> Option<PublisherRegistration>;

    fn register_cron(&self) -> Option<CronRegistration>;

    /// Free-form diagnostic lines for the `/readyz`-adjacent debug surface;
    /// not part of any invariant.
    fn get_state(&self) -> Vec<String> {
        let snap = self.counters().snapshot();
        vec![format!(
            "{}: started={} activity_failed={} activity_succeeded={} publish_failed={} publish_succeeded={}",
            self.kind().as_str(),
            snap.started,
            snap.activity_failed,
            snap.activity_succeeded,
            snap.publish_failed,
            snap.publish_succeeded
        )]
    }

    /// Dispatches one named activity with a protobuf-encoded payload and
    /// returns the protobuf-encoded response. Wraps the
    /// `started`/`activity_succeeded`/`activity_failed` bookkeeping;
    /// implementors call [`ActivityCounters::record_started`] before
    /// dispatch and [`ActivityCounters::record_activity_result`] after,
    /// which `run_activity` in this crate does uniformly.
    async fn activity(&self, name: &str, ctx: ActivityContext, payload: Vec<u8>) -> SiteAgentResult<Vec<u8>>;
}
