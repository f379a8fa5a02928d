//! The reconciliation tick: page both catalogs for one kind, diff by
//! fingerprint, and apply the minimum set of create/update/delete
//! operations through `Orchestrator::do_workflow` — the same path a
//! queue-delivered task takes, since cron-driven reconciliation follows the
//! same path but originates locally.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashSet;
use site_agent_config::ReconcileConfig;
use site_agent_core::{HealthState, ResourceKind, SiteAgentError, SiteAgentResult, TransactionId};
use site_agent_health::HealthCache;
use site_agent_managers::{kind_policy, ActivityContext, AlreadyExistsPolicy, DeletePolicy, ManagerRegistry};
use site_agent_workflow::{Orchestrator, RetryPolicyConfig};
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cloud::{CloudEntry, CloudPager};
use crate::fingerprint::{fingerprint, labels_to_map};
use crate::ops::{
    build_create_payload, build_delete_payload, build_mark_orphaned_payload, build_update_payload, reconcile_ops,
    ORPHANED_STATUS,
};
use crate::site::{SiteEntry, SitePager};

/// One classified difference between the Cloud's and the Site's view of a
/// kind.
enum Action {
    Create(CloudEntry),
    Update(CloudEntry, String),
    Delete(String),
    MarkOrphaned(SiteEntry),
}

/// Result counts for one tick, published to the state counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickSummary {
    pub no_op: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub marked_orphaned: usize,
    pub failed: usize,
}

impl TickSummary {
    fn applied(&self) -> usize {
        self.created + self.updated + self.deleted + self.marked_orphaned
    }
}

pub struct ReconcileEngine {
    site_id: String,
    cloud: CloudPager,
    site_pagers: HashMap<ResourceKind, SitePager>,
    orchestrator: Arc<Orchestrator>,
    registry: Arc<ManagerRegistry>,
    retry: RetryPolicyConfig,
    config: ReconcileConfig,
    health: Arc<HealthCache>,
    /// Cloud ids this process has already issued a create for, consulted
    /// by `AlreadyExistsPolicy::IdempotentIfSeen`: a conflict on a cloud id
    /// we ourselves attempted is our own retry racing a slow first
    /// attempt, not two distinct intents colliding.
    attempted_creates: DashSet<(ResourceKind, String)>,
}

impl ReconcileEngine {
    pub fn new(
        site_id: impl Into<String>,
        cloud: CloudPager,
        site_pagers: Vec<SitePager>,
        orchestrator: Arc<Orchestrator>,
        registry: Arc<ManagerRegistry>,
        retry: RetryPolicyConfig,
        config: ReconcileConfig,
        health: Arc<HealthCache>,
    ) -> Self {
        let site_pagers = site_pagers.into_iter().map(|p| (p.kind(), p)).collect();
        Self {
            site_id: site_id.into(),
            cloud,
            site_pagers,
            orchestrator,
            registry,
            retry,
            config,
            health,
            attempted_creates: DashSet::new(),
        }
    }

    /// One full page-diff-apply pass for `kind`. Never returns an error
    /// itself: a paging failure is recorded as a failed tick on the health
    /// cache and an empty summary, so the tick is abandoned and the next
    /// tick starts fresh — applied here to any failure, not only a
    /// deadline.
    pub async fn tick(&self, kind: ResourceKind) -> TickSummary {
        let started = Instant::now();
        match self.tick_inner(kind).await {
            Ok(summary) => {
                info!(
                    kind = kind.as_str(),
                    no_op = summary.no_op,
                    created = summary.created,
                    updated = summary.updated,
                    deleted = summary.deleted,
                    marked_orphaned = summary.marked_orphaned,
                    failed = summary.failed,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "reconcile tick complete"
                );
                let state = if summary.failed == 0 { HealthState::Up } else { HealthState::Error };
                self.health.update_inventory(
                    state,
                    format!(
                        "{}: {} applied, {} no-op, {} failed",
                        kind.as_str(),
                        summary.applied(),
                        summary.no_op,
                        summary.failed
                    ),
                );
                summary
            }
            Err(err) => {
                warn!(kind = kind.as_str(), %err, "reconcile tick abandoned: paging failed");
                self.health.update_inventory(HealthState::Error, format!("{}: tick failed: {err}", kind.as_str()));
                TickSummary::default()
            }
        }
    }

    async fn tick_inner(&self, kind: ResourceKind) -> SiteAgentResult<TickSummary> {
        let cloud_map = self.page_cloud(kind).await?;
        let site_map = self.page_site(kind).await?;

        let mut actions = Vec::new();
        let mut no_op = 0usize;

        for (cloud_id, (entry, cloud_fp)) in &cloud_map {
            match site_map.get(cloud_id) {
                None => actions.push(Action::Create(entry.clone())),
                Some(site_entry) => {
                    let site_fp = fingerprint(
                        &site_entry.name,
                        &site_entry.parent_cloud_id,
                        site_entry.status,
                        &site_entry.labels,
                        &site_entry.attributes,
                    );
                    if &site_fp == cloud_fp {
                        no_op += 1;
                    } else {
                        actions.push(Action::Update(entry.clone(), site_entry.site_id.clone()));
                    }
                }
            }
        }

        for (cloud_id, site_entry) in &site_map {
            if cloud_map.contains_key(cloud_id) {
                continue;
            }
            match kind_policy(kind).delete_policy {
                DeletePolicy::AutoDelete => actions.push(Action::Delete(cloud_id.clone())),
                DeletePolicy::MarkOrphaned => {
                    if site_entry.status != ORPHANED_STATUS {
                        actions.push(Action::MarkOrphaned(site_entry.clone()));
                    } else {
                        no_op += 1;
                    }
                }
            }
        }

        let mut summary = self.apply(kind, actions).await;
        summary.no_op = no_op;
        Ok(summary)
    }

    async fn page_cloud(&self, kind: ResourceKind) -> SiteAgentResult<HashMap<String, (CloudEntry, [u8; 32])>> {
        let mut map = HashMap::new();
        let mut page_token = String::new();
        loop {
            let page = self
                .cloud
                .list(&self.site_id, kind.as_str(), page_token, self.config.cloud_page_size as i32)
                .await?;
            for entry in page.entries {
                let labels = labels_to_map(&entry.labels);
                let attributes: std::collections::BTreeMap<String, String> =
                    entry.attributes.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                let fp = fingerprint(&entry.name, &entry.parent_cloud_id, entry.status, &labels, &attributes);
                map.insert(entry.cloud_id.clone(), (entry, fp));
            }
            if page.next_page_token.is_empty() {
                break;
            }
            page_token = page.next_page_token;
        }
        Ok(map)
    }

    async fn page_site(&self, kind: ResourceKind) -> SiteAgentResult<HashMap<String, SiteEntry>> {
        let pager = self
            .site_pagers
            .get(&kind)
            .ok_or_else(|| SiteAgentError::Config(format!("no site pager registered for kind {kind:?}")))?;

        let mut map = HashMap::new();
        let mut page_token = String::new();
        loop {
            let page = pager.list(page_token, self.config.site_page_size as i32).await?;
            for entry in page.entries {
                if entry.cloud_id.is_empty() {
                    // Discovered on-site but never reported to the Cloud yet;
                    // nothing in the Cloud catalog to diff it against.
                    continue;
                }
                map.insert(entry.cloud_id.clone(), entry);
            }
            if page.next_page_token.is_empty() {
                break;
            }
            page_token = page.next_page_token;
        }
        Ok(map)
    }

    /// Applies every classified action through a bounded worker pool: each
    /// operation is a separate workflow invocation so that a single
    /// failure does not block the rest.
    async fn apply(&self, kind: ResourceKind, actions: Vec<Action>) -> TickSummary {
        let ops = reconcile_ops(kind);
        let publish_workflow = self.registry.get(kind).and_then(|m| m.register_publisher()).map(|p| p.workflow_name);
        let semaphore = Arc::new(Semaphore::new(self.config.apply_concurrency.max(1)));
        let deadline = Duration::from_secs(self.config.default_interval_secs.max(1));

        let mut handles = Vec::with_capacity(actions.len());
        for action in actions {
            let Some((activity_name, cloud_id, payload, is_create, transaction_id)) = self.action_payload(kind, &ops, action) else {
                continue;
            };
            let semaphore = semaphore.clone();
            let orchestrator = self.orchestrator.clone();
            let retry = self.retry;
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                let ctx = ActivityContext { transaction_id, deadline };
                let outcome = orchestrator.do_workflow(kind, activity_name, ctx, payload, publish_workflow, retry).await;
                (activity_name, cloud_id, is_create, outcome)
            }));
        }

        let mut summary = TickSummary::default();
        for handle in handles {
            let Ok((activity_name, cloud_id, is_create, outcome)) = handle.await else {
                summary.failed += 1;
                continue;
            };

            match outcome.status {
                site_agent_workflow::WorkflowStatus::Success => {
                    self.record_success(activity_name, ops, &mut summary);
                    if is_create {
                        self.attempted_creates.insert((kind, cloud_id));
                    }
                }
                _ => {
                    let resolved = is_create && self.resolve_already_exists(kind, &cloud_id, outcome.activity_error.as_ref());
                    if resolved {
                        self.record_success(activity_name, ops, &mut summary);
                        self.attempted_creates.insert((kind, cloud_id));
                    } else {
                        let message = outcome
                            .activity_error
                            .as_ref()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "unknown reconcile apply failure".to_string());
                        warn!(kind = kind.as_str(), activity = %activity_name, cloud_id = %cloud_id, %message, "reconcile apply failed");
                        summary.failed += 1;
                        if is_create {
                            self.attempted_creates.insert((kind, cloud_id));
                        }
                    }
                }
            }
        }
        summary
    }

    fn record_success(&self, activity_name: &'static str, ops: crate::ops::ReconcileOps, summary: &mut TickSummary) {
        if Some(activity_name) == ops.create_workflow {
            summary.created += 1;
        } else if Some(activity_name) == ops.update_workflow {
            summary.updated += 1;
        } else if Some(activity_name) == ops.delete_workflow {
            summary.deleted += 1;
        } else {
            summary.marked_orphaned += 1;
        }
    }

    /// `AlreadyExistsPolicy` consultation: only reached for the create
    /// path, since update/delete/mark-orphaned never race a same-intent
    /// duplicate the same way a create can.
    fn resolve_already_exists(&self, kind: ResourceKind, cloud_id: &str, error: Option<&SiteAgentError>) -> bool {
        let Some(SiteAgentError::Conflict { .. }) = error else {
            return false;
        };
        match kind_policy(kind).already_exists_policy {
            AlreadyExistsPolicy::AlwaysIdempotent => true,
            AlreadyExistsPolicy::IdempotentIfSeen => self.attempted_creates.contains(&(kind, cloud_id.to_string())),
            AlreadyExistsPolicy::AlwaysEscalate => false,
        }
    }

    /// Builds one action's activity name, routing key, protobuf payload,
    /// whether it is a create, and the `TransactionId` embedded in that same
    /// payload — reused as `ActivityContext::transaction_id` so the ordering
    /// key and the idempotence key the site controller sees are the same
    /// value, not two independently generated ones.
    fn action_payload(
        &self,
        kind: ResourceKind,
        ops: &crate::ops::ReconcileOps,
        action: Action,
    ) -> Option<(&'static str, String, Vec<u8>, bool, TransactionId)> {
        let txn = TransactionId::new(Uuid::new_v4(), chrono::Utc::now().timestamp());
        match action {
            Action::Create(entry) => {
                let name = ops.create_workflow?;
                let payload = build_create_payload(kind, txn, &entry)?;
                Some((name, entry.cloud_id, payload, true, txn))
            }
            Action::Update(entry, site_id) => {
                let name = ops.update_workflow?;
                let cloud_id = entry.cloud_id.clone();
                let payload = build_update_payload(kind, txn, &site_id, &entry)?;
                Some((name, cloud_id, payload, false, txn))
            }
            Action::Delete(cloud_id) => {
                let name = ops.delete_workflow?;
                let payload = build_delete_payload(kind, txn, &cloud_id)?;
                Some((name, cloud_id, payload, false, txn))
            }
            Action::MarkOrphaned(site_entry) => {
                let name = ops.update_workflow?;
                let cloud_id = site_entry.cloud_id.clone();
                let site_id = site_entry.site_id.clone();
                let payload = build_mark_orphaned_payload(kind, txn, &site_id, &site_entry)?;
                Some((name, cloud_id, payload, false, txn))
            }
        }
    }
}
