//! Shared state backing the atomic gRPC client.
//!
//! The connection object itself (a `tonic::transport::Channel`) is owned by
//! `site-agent-grpc::AtomicClient<T>`, which wraps one of these per wrapped
//! service. This crate only holds the version counter, credentials, and
//! failure/success tallies so that `site-agent-core` stays free of a
//! `tonic::transport` dependency on anything beyond `Status`/error mapping.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// mTLS material for one controller connection, as installed by the
/// bootstrap crate. Stored atomically on disk (write-temp-then-rename); this
/// struct is the in-memory mirror handed to `Reinitialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialEnvelope {
    pub client_cert: Vec<u8>,
    pub client_key: Vec<u8>,
    pub server_ca: Vec<u8>,
    pub expires_at: DateTime<Utc>,
}

impl CredentialEnvelope {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// `{version, credentials, lastError, grpcFailCount, grpcSuccCount}`.
/// `version` increases strictly monotonically — every `bump_version` is a
/// `fetch_add(1)`, never a direct store, so a decrease is structurally
/// impossible rather than merely untested.
#[derive(Debug, Default)]
pub struct AtomicClientState {
    version: AtomicI64,
    credentials: ArcSwap<Option<CredentialEnvelope>>,
    last_error: Mutex<Option<String>>,
    grpc_fail_count: AtomicU64,
    grpc_succ_count: AtomicU64,
}

impl AtomicClientState {
    pub fn new() -> Self {
        Self {
            version: AtomicI64::new(0),
            credentials: ArcSwap::from_pointee(None),
            last_error: Mutex::new(None),
            grpc_fail_count: AtomicU64::new(0),
            grpc_succ_count: AtomicU64::new(0),
        }
    }

    pub fn version(&self) -> i64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Called only by `Reinitialize` after a successful liveness probe.
    /// Returns the new version.
    pub fn bump_version(&self) -> i64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn credentials(&self) -> Option<CredentialEnvelope> {
        (**self.credentials.load()).clone()
    }

    pub fn set_credentials(&self, creds: CredentialEnvelope) {
        self.credentials.store(std::sync::Arc::new(Some(creds)));
    }

    pub fn record_success(&self) {
        self.grpc_succ_count.fetch_add(1, Ordering::SeqCst);
        *self.last_error.lock().expect("last_error poisoned") = None;
    }

    pub fn record_failure(&self, message: impl Into<String>) {
        self.grpc_fail_count.fetch_add(1, Ordering::SeqCst);
        *self.last_error.lock().expect("last_error poisoned") = Some(message.into());
    }

    pub fn status(&self) -> ClientStatus {
        ClientStatus {
            version: self.version(),
            fail_count: self.grpc_fail_count.load(Ordering::SeqCst),
            succ_count: self.grpc_succ_count.load(Ordering::SeqCst),
            last_error: self.last_error.lock().expect("last_error poisoned").clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientStatus {
    pub version: i64,
    pub fail_count: u64,
    pub succ_count: u64,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_only_moves_forward() {
        let state = AtomicClientState::new();
        assert_eq!(state.version(), 0);
        assert_eq!(state.bump_version(), 1);
        assert_eq!(state.bump_version(), 2);
        assert_eq!(state.version(), 2);
    }

    #[test]
    fn failure_then_success_clears_last_error() {
        let state = AtomicClientState::new();
        state.record_failure("controller unavailable");
        assert_eq!(state.status().last_error.as_deref(), Some("controller unavailable"));
        state.record_success();
        assert_eq!(state.status().last_error, None);
        assert_eq!(state.status().succ_count, 1);
        assert_eq!(state.status().fail_count, 1);
    }
}
