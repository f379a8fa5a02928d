//! `CredentialBootstrapManager` — the only component registering OTP
//! workflows, and the one place credential files are
//! written, read back, and pushed into the two `AtomicClient`s.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use site_agent_core::{CredentialEnvelope, SiteAgentError, SiteAgentResult, SiteId};
use site_agent_grpc::ReinitializableClient;
use site_agent_proto::bootstrap::credential_bootstrap_client::CredentialBootstrapClient;
use site_agent_proto::bootstrap::DownloadCredentialsRequest;
use tonic::transport::Channel;
use tracing::{info, warn};

use crate::install::atomic_write;
use crate::state::{BootstrapState, BootstrapStateCell};

pub struct CredentialBootstrapManager {
    site_id: SiteId,
    bootstrap_endpoint: String,
    config_dir: PathBuf,
    is_master: bool,
    state: BootstrapStateCell,
    last_installed_otp_hash: Mutex<Option<[u8; 32]>>,
    clients: Vec<Arc<dyn ReinitializableClient>>,
}

impl CredentialBootstrapManager {
    pub fn new(
        site_id: SiteId,
        bootstrap_endpoint: impl Into<String>,
        config_dir: PathBuf,
        is_master: bool,
        clients: Vec<Arc<dyn ReinitializableClient>>,
    ) -> Self {
        Self {
            site_id,
            bootstrap_endpoint: bootstrap_endpoint.into(),
            config_dir,
            is_master,
            state: BootstrapStateCell::new(),
            last_installed_otp_hash: Mutex::new(None),
            clients,
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state.get()
    }

    pub fn is_master(&self) -> bool {
        self.is_master
    }

    fn certs_dir(&self) -> PathBuf {
        self.config_dir.join("certs")
    }

    /// The only ingress for OTP delivery; registered as a workflow activity
    /// on the subscribe queue. Idempotent: a duplicate delivery of the same
    /// OTP value is a no-op once the first install has succeeded.
    pub async fn receive_and_save_otp(&self, otp: &str) -> SiteAgentResult<()> {
        let otp_hash = *blake3::hash(otp.as_bytes()).as_bytes();
        {
            let last = self.last_installed_otp_hash.lock().expect("poisoned");
            if *last == Some(otp_hash) {
                info!(site_id = %self.site_id, "duplicate OTP delivery, already installed");
                return Ok(());
            }
        }

        self.download_and_store_creds(Some(otp.to_string())).await?;

        *self.last_installed_otp_hash.lock().expect("poisoned") = Some(otp_hash);
        Ok(())
    }

    /// Direct-call variant used for first boot, bypassing the workflow
    /// engine entirely.
    pub async fn download_and_store_creds(&self, otp_override: Option<String>) -> SiteAgentResult<CredentialEnvelope> {
        self.state.set(BootstrapState::Fetching);

        let otp = otp_override.ok_or_else(|| {
            SiteAgentError::Config("no OTP supplied for first-boot credential download".to_string())
        })?;

        let channel = Channel::from_shared(self.bootstrap_endpoint.clone())
            .map_err(|e| SiteAgentError::Config(format!("invalid bootstrap endpoint: {e}")))?
            .connect()
            .await
            .map_err(|e| SiteAgentError::Transport {
                kind: "bootstrap".to_string(),
                operation: "DownloadCredentials".to_string(),
                message: e.to_string(),
            })?;

        let mut client = CredentialBootstrapClient::new(channel);
        let response = client
            .download_credentials(DownloadCredentialsRequest {
                site_id: self.site_id.as_str().to_string(),
                otp,
            })
            .await
            .map_err(|status| SiteAgentError::wrap("bootstrap", "DownloadCredentials", &status))?
            .into_inner();

        let expires_at = Utc
            .timestamp_opt(response.expires_at_unix_seconds, 0)
            .single()
            .unwrap_or_else(Utc::now);

        let envelope = CredentialEnvelope {
            client_cert: response.client_cert,
            client_key: response.client_key,
            server_ca: response.server_ca,
            expires_at,
        };

        self.install(&envelope)?;
        self.reinitialize_clients(envelope.clone()).await?;

        self.state.set(BootstrapState::Installed);
        Ok(envelope)
    }

    fn install(&self, envelope: &CredentialEnvelope) -> SiteAgentResult<()> {
        let dir = self.certs_dir();
        atomic_write(&dir.join("client.crt"), &envelope.client_cert, 0o600)?;
        atomic_write(&dir.join("client.key"), &envelope.client_key, 0o600)?;
        atomic_write(&dir.join("server-ca.crt"), &envelope.server_ca, 0o600)?;
        Ok(())
    }

    async fn reinitialize_clients(&self, envelope: CredentialEnvelope) -> SiteAgentResult<()> {
        for client in &self.clients {
            if let Err(err) = client.reinitialize(envelope.clone()).await {
                warn!(client = client.name(), %err, "failed to reinitialize gRPC client after credential install");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Re-reads `{configDir}/certs/*` from disk and pushes it into every
    /// registered client. Run by non-master replicas on a poll interval, and
    /// by the master itself right after `receive_and_save_otp` installs.
    pub fn reload_from_disk(&self) -> SiteAgentResult<CredentialEnvelope> {
        let dir = self.certs_dir();
        let client_cert = std::fs::read(dir.join("client.crt"))
            .map_err(|e| SiteAgentError::Config(format!("client.crt missing: {e}")))?;
        let client_key = std::fs::read(dir.join("client.key"))
            .map_err(|e| SiteAgentError::Config(format!("client.key missing: {e}")))?;
        let server_ca = std::fs::read(dir.join("server-ca.crt"))
            .map_err(|e| SiteAgentError::Config(format!("server-ca.crt missing: {e}")))?;

        Ok(CredentialEnvelope {
            client_cert,
            client_key,
            server_ca,
            // The on-disk envelope does not carry expiry; a real deployment
            // reads it back out of the certificate itself. Rotation is
            // driven by the Cloud sending a fresh OTP, not by this field.
            expires_at: Utc::now() + chrono::Duration::days(365),
        })
    }

    /// `reload_from_disk` plus pushing the result into every registered
    /// client — the startup-path equivalent of what `watch_for_rotation`
    /// does on every detected change, exposed so the binary can bring an
    /// already-provisioned site online without waiting for the watcher's
    /// first poll.
    pub async fn reinitialize_from_disk(&self) -> SiteAgentResult<CredentialEnvelope> {
        let envelope = self.reload_from_disk()?;
        self.reinitialize_clients(envelope.clone()).await?;
        Ok(envelope)
    }

    /// Spawned once at startup for non-master replicas: polls the cert
    /// directory's mtime and reloads+reinitializes on change.
    pub async fn watch_for_rotation(self: Arc<Self>, poll_interval: Duration) {
        let mut last_seen = self.certs_mtime();
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            let current = self.certs_mtime();
            if current != last_seen {
                last_seen = current;
                match self.reload_from_disk() {
                    Ok(envelope) => {
                        if let Err(err) = self.reinitialize_clients(envelope).await {
                            warn!(%err, "failed to reinitialize clients after detecting credential rotation");
                        } else {
                            info!(site_id = %self.site_id, "reloaded rotated credentials from disk");
                        }
                    }
                    Err(err) => warn!(%err, "credential files changed but could not be read"),
                }
            }
        }
    }

    fn certs_mtime(&self) -> Option<std::time::SystemTime> {
        std::fs::metadata(self.certs_dir().join("client.crt"))
            .and_then(|m| m.modified())
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CredentialBootstrapManager::new(
            SiteId::new("site-1"),
            "http://127.0.0.1:1".to_string(),
            dir.path().to_path_buf(),
            true,
            Vec::new(),
        );
        assert_eq!(mgr.state(), BootstrapState::Uninitialized);
    }

    #[test]
    fn reload_without_install_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CredentialBootstrapManager::new(
            SiteId::new("site-1"),
            "http://127.0.0.1:1".to_string(),
            dir.path().to_path_buf(),
            false,
            Vec::new(),
        );
        assert!(mgr.reload_from_disk().is_err());
    }
}
