//! The atomic gRPC client: a hot-swappable handle that survives credential
//! rotation and controller restarts without dropping in-flight calls.
//!
//! One [`AtomicClient<S>`] per wrapped service (machine controller, rack
//! controller). The hot path (`call`) is a lock-free `ArcSwapOption` load;
//! `reinitialize` serializes behind a single-writer `tokio::sync::Mutex` and
//! only swaps the channel after a successful liveness probe. TLS setup goes
//! through tonic's own `ClientTlsConfig` rather than a hand-rolled
//! `rustls::ClientConfig` builder, since it wraps the same rustls stack
//! without hand-rolled PEM parsing.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use site_agent_core::{AtomicClientState, ClientStatus, CredentialEnvelope, SiteAgentError};
use site_agent_health::HealthCache;
use tokio::sync::Mutex as AsyncMutex;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};
use tonic::Status;
use tracing::{debug, info, warn};

const PROBE_DEADLINE: Duration = Duration::from_secs(3);

/// One implementation per wrapped gRPC service. `Client` is the
/// tonic-generated stub type (e.g.
/// `site_agent_proto::machine::machine_controller_client::MachineControllerClient<Channel>`).
pub trait GrpcService: Send + Sync + 'static {
    type Client: Clone + Send + 'static;

    fn from_channel(channel: Channel) -> Self::Client;

    /// A short-deadline RPC used as the liveness probe during `Reinitialize`.
    fn probe(client: Self::Client) -> Pin<Box<dyn Future<Output = Result<(), Status>> + Send>>;

    fn name() -> &'static str;
}

pub struct AtomicClient<S: GrpcService> {
    endpoint_addr: String,
    channel: ArcSwapOption<Channel>,
    state: Arc<AtomicClientState>,
    reinit_lock: AsyncMutex<()>,
    health: Option<Arc<HealthCache>>,
    _service: PhantomData<S>,
}

impl<S: GrpcService> AtomicClient<S> {
    pub fn new(endpoint_addr: impl Into<String>) -> Self {
        Self {
            endpoint_addr: endpoint_addr.into(),
            channel: ArcSwapOption::from(None),
            state: Arc::new(AtomicClientState::new()),
            reinit_lock: AsyncMutex::new(()),
            health: None,
            _service: PhantomData,
        }
    }

    /// Wires this client's success/failure outcomes into the shared
    /// `controller_connection_health` field: every successful call or a
    /// run of consecutive failures reaching the threshold flips it.
    pub fn with_health(mut self, health: Arc<HealthCache>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn version(&self) -> i64 {
        self.state.version()
    }

    pub fn status(&self) -> ClientStatus {
        self.state.status()
    }

    pub fn is_connected(&self) -> bool {
        self.channel.load().is_some()
    }

    /// Swaps in a freshly probed connection built from `creds`. Idempotent:
    /// a second call with byte-identical credentials while the first is
    /// already installed is a no-op.
    pub async fn reinitialize(&self, creds: CredentialEnvelope) -> Result<(), SiteAgentError> {
        let _guard = self.reinit_lock.lock().await;

        if self.channel.load().is_some() {
            if let Some(current) = self.state.credentials() {
                if current == creds {
                    debug!(service = S::name(), "reinitialize no-op: credentials unchanged");
                    return Ok(());
                }
            }
        }

        let tls = build_tls_config(&creds)
            .map_err(|e| SiteAgentError::Credential {
                kind: S::name().to_string(),
                operation: "Reinitialize".to_string(),
                message: e,
            })?;

        let endpoint = Endpoint::from_shared(self.endpoint_addr.clone())
            .map_err(|e| SiteAgentError::Config(format!("invalid endpoint {}: {e}", self.endpoint_addr)))?
            .tls_config(tls)
            .map_err(|e| SiteAgentError::Credential {
                kind: S::name().to_string(),
                operation: "Reinitialize".to_string(),
                message: e.to_string(),
            })?;

        let new_channel = endpoint.connect_lazy();

        let probe_client = S::from_channel(new_channel.clone());
        match tokio::time::timeout(PROBE_DEADLINE, S::probe(probe_client)).await {
            Ok(Ok(())) => {}
            Ok(Err(status)) => {
                warn!(service = S::name(), %status, "reinitialize probe failed");
                return Err(SiteAgentError::wrap(S::name(), "Reinitialize", &status));
            }
            Err(_) => {
                return Err(SiteAgentError::Transport {
                    kind: S::name().to_string(),
                    operation: "Reinitialize".to_string(),
                    message: "probe deadline exceeded".to_string(),
                });
            }
        }

        self.channel.store(Some(Arc::new(new_channel)));
        self.state.set_credentials(creds);
        let new_version = self.state.bump_version();
        info!(service = S::name(), version = new_version, "gRPC connection reinitialized");
        Ok(())
    }

    /// Dispatches one gRPC call against the current connection. Concurrent
    /// callers all load the same `Arc<Channel>`; a racing `reinitialize`
    /// never cancels an in-flight call, it simply stops being the connection
    /// future callers see.
    pub async fn call<F, Fut, R>(&self, operation: &str, f: F) -> Result<R, SiteAgentError>
    where
        F: FnOnce(S::Client) -> Fut,
        Fut: Future<Output = Result<tonic::Response<R>, Status>>,
    {
        let channel = self.channel.load_full().ok_or_else(|| SiteAgentError::Credential {
            kind: S::name().to_string(),
            operation: operation.to_string(),
            message: "client not yet initialized; awaiting credential bootstrap".to_string(),
        })?;

        let client = S::from_channel((*channel).clone());
        match f(client).await {
            Ok(response) => {
                self.state.record_success();
                if let Some(health) = &self.health {
                    health.record_controller_call(true, format!("{} {operation} ok", S::name()));
                }
                Ok(response.into_inner())
            }
            Err(status) => {
                self.state.record_failure(status.message());
                if let Some(health) = &self.health {
                    health.record_controller_call(
                        false,
                        format!("{} {operation} failed: {}", S::name(), status.message()),
                    );
                }
                Err(SiteAgentError::wrap(S::name(), operation, &status))
            }
        }
    }
}

fn build_tls_config(creds: &CredentialEnvelope) -> Result<ClientTlsConfig, String> {
    let ca = Certificate::from_pem(&creds.server_ca);
    let identity = Identity::from_pem(&creds.client_cert, &creds.client_key);
    Ok(ClientTlsConfig::new().ca_certificate(ca).identity(identity))
}

/// Object-safe facade over `AtomicClient::reinitialize`, so the bootstrap
/// crate can hold a `Vec<Arc<dyn ReinitializableClient>>` spanning the
/// machine and rack controller clients without being generic over `S`.
#[async_trait::async_trait]
pub trait ReinitializableClient: Send + Sync {
    async fn reinitialize(&self, creds: CredentialEnvelope) -> Result<(), SiteAgentError>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
impl<S: GrpcService> ReinitializableClient for AtomicClient<S> {
    async fn reinitialize(&self, creds: CredentialEnvelope) -> Result<(), SiteAgentError> {
        AtomicClient::reinitialize(self, creds).await
    }

    fn name(&self) -> &'static str {
        S::name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct FakeClient;

    struct FakeService;

    impl GrpcService for FakeService {
        type Client = FakeClient;

        fn from_channel(_channel: Channel) -> Self::Client {
            FakeClient
        }

        fn probe(_client: Self::Client) -> Pin<Box<dyn Future<Output = Result<(), Status>> + Send>> {
            Box::pin(async { Ok(()) })
        }

        fn name() -> &'static str {
            "fake"
        }
    }

    #[tokio::test]
    async fn uninitialized_client_rejects_calls() {
        let client: AtomicClient<FakeService> = AtomicClient::new("http://127.0.0.1:1");
        assert_eq!(client.version(), 0);
        assert!(!client.is_connected());
    }
}
