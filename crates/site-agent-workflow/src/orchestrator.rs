//! The Orchestrator: `do_workflow`/`do_activity` against the
//! `ManagerRegistry`, with per-kind+workflow latency recorded to
//! [`MetricsRegistry`].
//!
//! `do_workflow` returns a [`WorkflowOutcome`] rather than a bare
//! two-error tuple, since the caller (the adapter's dispatch loop) also
//! needs the activity's response bytes to complete the task — the two
//! `Option<SiteAgentError>` fields are kept alongside it so nothing about
//! the "activity and publish are independently retriable" contract is
//! lost.

use std::sync::Arc;
use std::time::Instant;

use site_agent_core::{ResourceKind, SiteAgentError, SiteAgentResult};
use site_agent_health::MetricsRegistry;
use site_agent_managers::{ActivityContext, ManagerRegistry, ResourceManager};
use tracing::{info, warn};

use crate::client::{RetryPolicyConfig, WorkflowEngineHandle};

/// Four status values because a successful activity followed by a failed
/// publish leaves the Cloud inconsistent and must be visible distinctly
/// from an activity that never ran at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    Success,
    ActivityFailed,
    PublishFailed,
    /// The activity failed *and* the best-effort failure report back to the
    /// publish queue also failed — the Cloud has no way to learn about this
    /// attempt short of its own timeout.
    ActivityPublishFailed,
}

pub struct WorkflowOutcome {
    pub status: WorkflowStatus,
    pub response: Option<Vec<u8>>,
    pub activity_error: Option<SiteAgentError>,
    pub publish_error: Option<SiteAgentError>,
}

pub struct Orchestrator {
    registry: Arc<ManagerRegistry>,
    engine: WorkflowEngineHandle,
    publish_queue: String,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl Orchestrator {
    pub fn new(registry: Arc<ManagerRegistry>, engine: WorkflowEngineHandle, publish_queue: impl Into<String>) -> Self {
        Self {
            registry,
            engine,
            publish_queue: publish_queue.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Runs one named activity against the registered manager for `kind`
    /// with no publish step. Used for activities with no upstream side
    /// effect (power operations, firmware upgrades) and by `do_workflow`
    /// itself.
    pub async fn do_activity(
        &self,
        kind: ResourceKind,
        activity_name: &str,
        ctx: ActivityContext,
        payload: Vec<u8>,
    ) -> SiteAgentResult<Vec<u8>> {
        let manager = self.registry.require(kind)?;
        manager.activity(activity_name, ctx, payload).await
    }

    /// Executes the activity and, on success, publishes the resulting
    /// state upstream via `StartWorkflow` on the publish queue so the
    /// publish itself goes through the same durable, retriable path as
    /// every Cloud-originated task.
    pub async fn do_workflow(
        &self,
        kind: ResourceKind,
        activity_name: &str,
        ctx: ActivityContext,
        payload: Vec<u8>,
        publish_workflow: Option<&str>,
        retry: RetryPolicyConfig,
    ) -> WorkflowOutcome {
        let started = Instant::now();
        let outcome = self.do_workflow_inner(kind, activity_name, ctx, payload, publish_workflow, retry).await;

        if let Some(metrics) = &self.metrics {
            metrics.observe_workflow_latency(kind, activity_name, started.elapsed().as_secs_f64());
        }
        outcome
    }

    async fn do_workflow_inner(
        &self,
        kind: ResourceKind,
        activity_name: &str,
        ctx: ActivityContext,
        payload: Vec<u8>,
        publish_workflow: Option<&str>,
        retry: RetryPolicyConfig,
    ) -> WorkflowOutcome {
        let manager = match self.registry.require(kind) {
            Ok(manager) => manager,
            Err(err) => {
                return WorkflowOutcome {
                    status: WorkflowStatus::ActivityFailed,
                    response: None,
                    activity_error: Some(err),
                    publish_error: None,
                }
            }
        };

        let activity_result = manager.activity(activity_name, ctx, payload).await;

        let response = match activity_result {
            Ok(response) => response,
            Err(activity_error) => {
                warn!(kind = kind.as_str(), activity = activity_name, %activity_error, "activity failed");
                let publish_error = match publish_workflow {
                    Some(workflow_name) => self
                        .report_failure(kind, workflow_name, ctx, &activity_error, retry)
                        .await
                        .err(),
                    None => None,
                };
                let status = if publish_error.is_some() {
                    WorkflowStatus::ActivityPublishFailed
                } else {
                    WorkflowStatus::ActivityFailed
                };
                return WorkflowOutcome {
                    status,
                    response: None,
                    activity_error: Some(activity_error),
                    publish_error,
                };
            }
        };

        let Some(workflow_name) = publish_workflow else {
            return WorkflowOutcome {
                status: WorkflowStatus::Success,
                response: Some(response),
                activity_error: None,
                publish_error: None,
            };
        };

        match self
            .engine
            .start_workflow(&self.publish_queue, workflow_name, ctx.transaction_id, response.clone(), retry)
            .await
        {
            Ok(workflow_id) => {
                info!(kind = kind.as_str(), workflow = workflow_name, %workflow_id, "published resource state upstream");
                manager.counters().record_publish_result(true);
                WorkflowOutcome {
                    status: WorkflowStatus::Success,
                    response: Some(response),
                    activity_error: None,
                    publish_error: None,
                }
            }
            Err(publish_error) => {
                warn!(kind = kind.as_str(), workflow = workflow_name, %publish_error, "publish failed");
                manager.counters().record_publish_result(false);
                WorkflowOutcome {
                    status: WorkflowStatus::PublishFailed,
                    response: Some(response),
                    activity_error: None,
                    publish_error: Some(publish_error),
                }
            }
        }
    }

    async fn report_failure(
        &self,
        kind: ResourceKind,
        workflow_name: &str,
        ctx: ActivityContext,
        activity_error: &SiteAgentError,
        retry: RetryPolicyConfig,
    ) -> SiteAgentResult<()> {
        let payload = activity_error.to_string().into_bytes();
        self.engine
            .start_workflow(&self.publish_queue, workflow_name, ctx.transaction_id, payload, retry)
            .await
            .map(|_| ())
            .map_err(|e| {
                warn!(kind = kind.as_str(), %e, "failed to report activity failure upstream");
                e
            })
    }
}
