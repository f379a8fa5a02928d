//! The workflow engine boundary: the
//! [`WorkflowEngineAdapter`] polls the subscribe queue and dispatches tasks
//! through the [`Orchestrator`] to the per-kind [`site_agent_managers`]
//! registry, publishing results back upstream.
//!
//! Depends on `site-agent-managers`, never the other way around — see that
//! crate's module doc.

pub mod adapter;
pub mod client;
pub mod ordering;
pub mod orchestrator;

pub use adapter::WorkflowEngineAdapter;
pub use client::{transaction_id_from_proto, RetryPolicyConfig, WorkflowEngineHandle};
pub use ordering::OrderingTable;
pub use orchestrator::{Orchestrator, WorkflowOutcome, WorkflowStatus};
