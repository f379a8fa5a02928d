//! Shared data model for the site agent.
//!
//! This crate has no behavior of its own: it is the vocabulary every other
//! `site-agent-*` crate shares — resource kinds, ids, error taxonomy, the
//! atomic client state cell, and the three-field health snapshot.

pub mod client_state;
pub mod counters;
pub mod error;
pub mod health;
pub mod ids;
pub mod resource;

pub use client_state::{AtomicClientState, ClientStatus, CredentialEnvelope};
pub use counters::ActivityCounters;
pub use error::{ErrorClass, SiteAgentError, SiteAgentResult};
pub use health::{ComponentHealth, HealthSnapshot, HealthState};
pub use ids::{SiteId, TransactionId};
pub use resource::{Resource, ResourceKind, ResourceStatus};
