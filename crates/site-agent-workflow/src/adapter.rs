//! `WorkflowEngineAdapter`: registers every manager's subscribed workflow
//! names, long-polls the subscribe queue, and dispatches each delivered
//! task to the [`Orchestrator`] under per-resource ordering.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use prost::Message;
use site_agent_bootstrap::CredentialBootstrapManager;
use site_agent_core::{ResourceKind, SiteAgentError, SiteAgentResult};
use site_agent_managers::{ActivityContext, ManagerRegistry, ResourceManager};
use site_agent_proto::bootstrap::DownloadCredentialsRequest;
use site_agent_proto::workflow::Task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{transaction_id_from_proto, RetryPolicyConfig, WorkflowEngineHandle};
use crate::ordering::OrderingTable;
use crate::orchestrator::{Orchestrator, WorkflowStatus};

const POLL_TIMEOUT_SECONDS: i32 = 20;
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(2);

/// The only workflow name delivered outside the per-kind resource managers:
/// master-gated, so it is only ever present in `workflow_kinds`-adjacent
/// dispatch when `bootstrap` below is `Some`.
const RECEIVE_AND_SAVE_OTP_WORKFLOW: &str = "ReceiveAndSaveOTP";

pub struct WorkflowEngineAdapter {
    engine: WorkflowEngineHandle,
    registry: Arc<ManagerRegistry>,
    orchestrator: Arc<Orchestrator>,
    ordering: Arc<OrderingTable>,
    subscribe_queue: String,
    worker_id: String,
    retry: RetryPolicyConfig,
    default_deadline: Duration,
    /// Maps every workflow name any manager subscribes to back to its
    /// owning `ResourceKind`, built once at construction as a one-shot
    /// lookup table rather than a runtime registration call, since the
    /// registry itself is already write-once.
    workflow_kinds: HashMap<&'static str, ResourceKind>,
    /// `Some` only on the elected master replica — the one process that
    /// registers `ReceiveAndSaveOTP` as a subscriber workflow at all.
    bootstrap: Option<Arc<CredentialBootstrapManager>>,
}

impl WorkflowEngineAdapter {
    pub fn new(
        engine: WorkflowEngineHandle,
        registry: Arc<ManagerRegistry>,
        orchestrator: Arc<Orchestrator>,
        subscribe_queue: impl Into<String>,
        worker_id: impl Into<String>,
        retry: RetryPolicyConfig,
        default_deadline: Duration,
        bootstrap: Option<Arc<CredentialBootstrapManager>>,
    ) -> Self {
        let mut workflow_kinds = HashMap::new();
        for manager in registry.all() {
            for workflow_name in manager.register_subscriber().workflow_names {
                workflow_kinds.insert(workflow_name, manager.kind());
            }
        }

        Self {
            engine,
            registry,
            orchestrator,
            ordering: Arc::new(OrderingTable::new()),
            subscribe_queue: subscribe_queue.into(),
            worker_id: worker_id.into(),
            retry,
            default_deadline,
            workflow_kinds,
            bootstrap,
        }
    }

    /// The engine handle this adapter polls with, reused by the reconciler
    /// to start reconciliation-triggered create/update/delete workflows on
    /// the same queue a Cloud-originated task would land on.
    pub fn engine(&self) -> &WorkflowEngineHandle {
        &self.engine
    }

    pub fn retry(&self) -> RetryPolicyConfig {
        self.retry
    }

    pub fn subscribe_queue(&self) -> &str {
        &self.subscribe_queue
    }

    fn kind_for_workflow(&self, workflow_name: &str) -> Option<ResourceKind> {
        self.workflow_kinds.get(workflow_name).copied()
    }

    /// Runs the subscribe-queue long-poll loop until `cancel` fires. One
    /// task is spawned per delivered task so a slow activity never blocks
    /// the next poll; per-resource serialization happens inside
    /// `dispatch_task` via the ordering table.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(queue = %self.subscribe_queue, worker = %self.worker_id, "workflow adapter subscribe loop starting");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("workflow adapter subscribe loop stopping");
                    return;
                }
                polled = self.engine.poll_task(&self.subscribe_queue, &self.worker_id, POLL_TIMEOUT_SECONDS) => {
                    match polled {
                        Ok(Some(task)) => {
                            let this = self.clone();
                            tokio::spawn(async move { this.dispatch_task(task).await });
                        }
                        Ok(None) => debug!("poll_task long-poll timed out, no task queued"),
                        Err(err) => {
                            warn!(%err, "poll_task failed");
                            tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                        }
                    }
                }
            }
        }
    }

    async fn dispatch_task(&self, task: Task) {
        let task_id = task.task_id.clone();

        if task.workflow_name == RECEIVE_AND_SAVE_OTP_WORKFLOW {
            self.dispatch_receive_and_save_otp(task).await;
            return;
        }

        let kind = match self.kind_for_workflow(&task.workflow_name) {
            Some(kind) => kind,
            None => {
                error!(workflow = %task.workflow_name, "no manager registered for this workflow name");
                let _ = self
                    .engine
                    .fail_task(&task_id, format!("unrecognized workflow {}", task.workflow_name), false)
                    .await;
                return;
            }
        };

        let transaction_id = match transaction_id_from_proto(task.transaction_id) {
            Ok(t) => t,
            Err(err) => {
                let _ = self.engine.fail_task(&task_id, err.to_string(), false).await;
                return;
            }
        };

        let deadline = if task.start_to_close_deadline_unix_seconds > 0 {
            let now = chrono_now_unix_seconds();
            let remaining = task.start_to_close_deadline_unix_seconds - now;
            if remaining > 0 {
                Duration::from_secs(remaining as u64)
            } else {
                Duration::from_secs(1)
            }
        } else {
            self.default_deadline
        };

        let ctx = ActivityContext {
            transaction_id,
            deadline,
        };

        let _ordering_guard = self.ordering.acquire(kind, transaction_id.resource_id).await;

        let manager = match self.registry.require(kind) {
            Ok(manager) => manager.clone(),
            Err(err) => {
                let _ = self.engine.fail_task(&task_id, err.to_string(), false).await;
                return;
            }
        };
        let publish_workflow = manager.register_publisher().map(|p| p.workflow_name);

        let outcome = self
            .orchestrator
            .do_workflow(kind, &task.workflow_name, ctx, task.payload, publish_workflow, self.retry)
            .await;

        match outcome.status {
            WorkflowStatus::Success => {
                if let Err(err) = self.engine.complete_task(&task_id, outcome.response.unwrap_or_default()).await {
                    warn!(%err, task_id = %task_id, "complete_task failed after a successful workflow");
                }
            }
            _ => {
                let error: Option<&SiteAgentError> = outcome.activity_error.as_ref().or(outcome.publish_error.as_ref());
                let retryable = error.map(SiteAgentError::is_retryable).unwrap_or(true);
                let message = error.map(ToString::to_string).unwrap_or_else(|| "unknown workflow failure".to_string());
                if let Err(err) = self.engine.fail_task(&task_id, message, retryable).await {
                    warn!(%err, task_id = %task_id, "fail_task failed after a failed workflow");
                }
            }
        }
    }

    /// Handles `ReceiveAndSaveOTP` outside the per-kind dispatch path — the
    /// bootstrap manager is not a `ResourceManager` and has no counters or
    /// publish step, only the idempotent credential install. A non-master
    /// replica never reaches here because it never registers
    /// this workflow name with the engine in the first place; if the engine
    /// still routed one to it somehow, `self.bootstrap` is `None` and the
    /// task fails non-retryably rather than silently dropping the OTP.
    async fn dispatch_receive_and_save_otp(&self, task: Task) {
        let task_id = task.task_id.clone();

        let bootstrap = match &self.bootstrap {
            Some(bootstrap) => bootstrap,
            None => {
                error!("ReceiveAndSaveOTP delivered to a non-master replica");
                let _ = self
                    .engine
                    .fail_task(&task_id, "this replica does not handle OTP delivery".to_string(), false)
                    .await;
                return;
            }
        };

        let request = match DownloadCredentialsRequest::decode(task.payload.as_slice()) {
            Ok(request) => request,
            Err(err) => {
                let _ = self
                    .engine
                    .fail_task(&task_id, format!("failed to decode OTP payload: {err}"), false)
                    .await;
                return;
            }
        };

        match bootstrap.receive_and_save_otp(&request.otp).await {
            Ok(()) => {
                if let Err(err) = self.engine.complete_task(&task_id, Vec::new()).await {
                    warn!(%err, task_id = %task_id, "complete_task failed after OTP install");
                }
            }
            Err(err) => {
                let retryable = err.is_retryable();
                if let Err(fail_err) = self.engine.fail_task(&task_id, err.to_string(), retryable).await {
                    warn!(%fail_err, task_id = %task_id, "fail_task failed after OTP install error");
                }
            }
        }
    }
}

/// Current Unix time. Isolated in one place so nothing else in this crate
/// reaches for wall-clock time directly.
fn chrono_now_unix_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_construction_indexes_workflow_names_by_kind() {
        // Full construction needs a live ManagerRegistry + engine endpoint;
        // covered end-to-end by the integration tests in the root crate.
        // This module's unit-testable surface is `chrono_now_unix_seconds`
        // staying monotonic-ish, which isn't worth asserting on directly.
        assert!(chrono_now_unix_seconds() > 0);
    }
}
