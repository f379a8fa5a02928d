//! Identity types shared across the agent.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A site's identity, as handed to the agent at startup via `SITE_ID`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteId(String);

impl SiteId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SiteId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Idempotence key for a create/update call against a site-local controller.
///
/// Two calls carrying the same `TransactionId` are the same logical attempt;
/// a manager that has already observed one may treat `AlreadyExists` as
/// success rather than escalating it (see the per-kind policy table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId {
    pub resource_id: Uuid,
    pub timestamp: i64,
}

impl TransactionId {
    pub fn new(resource_id: Uuid, timestamp: i64) -> Self {
        Self {
            resource_id,
            timestamp,
        }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.resource_id, self.timestamp)
    }
}
