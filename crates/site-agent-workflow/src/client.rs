//! The workflow engine connection.
//!
//! Unlike the machine/rack controller clients in `site-agent-grpc`, this is
//! a single lazily-connecting `tonic` channel with no hot-swap: the engine
//! has no `GetVersion` probe to reinitialize against, and the agent is both
//! a client of it (polling, starting workflows) and, in single-process
//! deployments, its own implementation of the same service. Reconnection on
//! a dropped connection is handled by `Channel::connect_lazy` itself.

use site_agent_core::{SiteAgentError, SiteAgentResult, TransactionId};
use site_agent_proto::workflow::workflow_engine_client::WorkflowEngineClient;
use site_agent_proto::workflow::{
    CompleteTaskRequest, FailTaskRequest, PollTaskRequest, RecordHeartbeatRequest, RetryPolicy, StartWorkflowRequest,
    Task,
};
use tonic::transport::{Channel, Endpoint};

/// The retry policy shape, independent of `site-agent-config` so this
/// crate never needs to depend on it; `main.rs` is the only place that
/// converts `SiteAgentConfig::retry` into this.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicyConfig {
    pub initial_interval_ms: u64,
    pub backoff_coefficient: f64,
    pub max_interval_ms: u64,
    pub max_attempts: u32,
}

impl From<RetryPolicyConfig> for RetryPolicy {
    fn from(r: RetryPolicyConfig) -> Self {
        RetryPolicy {
            initial_interval_ms: r.initial_interval_ms as i64,
            backoff_coefficient: r.backoff_coefficient,
            max_interval_ms: r.max_interval_ms as i64,
            max_attempts: r.max_attempts as i32,
        }
    }
}

impl From<TransactionId> for site_agent_proto::common::TransactionId {
    fn from(t: TransactionId) -> Self {
        site_agent_proto::common::TransactionId {
            resource_id: t.resource_id.to_string(),
            timestamp: t.timestamp,
        }
    }
}

/// The wire `TransactionId` carries `resource_id` as a string; a task that
/// arrives with a malformed one is a validation error, not a panic.
pub fn transaction_id_from_proto(raw: Option<site_agent_proto::common::TransactionId>) -> SiteAgentResult<TransactionId> {
    let raw = raw.ok_or_else(|| SiteAgentError::Validation {
        kind: "workflow".to_string(),
        operation: "PollTask".to_string(),
        message: "task delivered with no transaction_id".to_string(),
    })?;
    let resource_id = uuid::Uuid::parse_str(&raw.resource_id).map_err(|e| SiteAgentError::Validation {
        kind: "workflow".to_string(),
        operation: "PollTask".to_string(),
        message: format!("invalid transaction_id.resource_id: {e}"),
    })?;
    Ok(TransactionId::new(resource_id, raw.timestamp))
}

#[derive(Clone)]
pub struct WorkflowEngineHandle {
    client: WorkflowEngineClient<Channel>,
}

impl WorkflowEngineHandle {
    pub fn connect_lazy(addr: impl Into<String>) -> SiteAgentResult<Self> {
        let addr = addr.into();
        let endpoint = Endpoint::from_shared(addr.clone())
            .map_err(|e| SiteAgentError::Config(format!("invalid workflow engine endpoint {addr}: {e}")))?;
        Ok(Self {
            client: WorkflowEngineClient::new(endpoint.connect_lazy()),
        })
    }

    pub async fn poll_task(&self, queue: &str, worker_id: &str, poll_timeout_seconds: i32) -> SiteAgentResult<Option<Task>> {
        let mut client = self.client.clone();
        let response = client
            .poll_task(PollTaskRequest {
                queue: queue.to_string(),
                worker_id: worker_id.to_string(),
                poll_timeout_seconds,
            })
            .await
            .map_err(|status| SiteAgentError::wrap("workflow_engine", "PollTask", &status))?
            .into_inner();
        Ok(response.task)
    }

    pub async fn start_workflow(
        &self,
        queue: &str,
        workflow_name: &str,
        transaction_id: TransactionId,
        payload: Vec<u8>,
        retry: RetryPolicyConfig,
    ) -> SiteAgentResult<String> {
        let mut client = self.client.clone();
        let response = client
            .start_workflow(StartWorkflowRequest {
                queue: queue.to_string(),
                workflow_name: workflow_name.to_string(),
                transaction_id: Some(transaction_id.into()),
                payload,
                retry_policy: Some(retry.into()),
            })
            .await
            .map_err(|status| SiteAgentError::wrap("workflow_engine", "StartWorkflow", &status))?
            .into_inner();
        Ok(response.workflow_id)
    }

    pub async fn complete_task(&self, task_id: &str, result: Vec<u8>) -> SiteAgentResult<()> {
        let mut client = self.client.clone();
        client
            .complete_task(CompleteTaskRequest {
                task_id: task_id.to_string(),
                result,
            })
            .await
            .map_err(|status| SiteAgentError::wrap("workflow_engine", "CompleteTask", &status))?;
        Ok(())
    }

    pub async fn fail_task(&self, task_id: &str, error_message: String, retryable: bool) -> SiteAgentResult<()> {
        let mut client = self.client.clone();
        client
            .fail_task(FailTaskRequest {
                task_id: task_id.to_string(),
                error_message,
                retryable,
            })
            .await
            .map_err(|status| SiteAgentError::wrap("workflow_engine", "FailTask", &status))?;
        Ok(())
    }

    /// Returns whether the engine has requested cancellation of this task.
    pub async fn record_heartbeat(&self, task_id: &str) -> SiteAgentResult<bool> {
        let mut client = self.client.clone();
        let response = client
            .record_heartbeat(RecordHeartbeatRequest {
                task_id: task_id.to_string(),
            })
            .await
            .map_err(|status| SiteAgentError::wrap("workflow_engine", "RecordHeartbeat", &status))?
            .into_inner();
        Ok(response.cancelled)
    }
}
