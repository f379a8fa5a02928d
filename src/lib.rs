//! Assembles one `site-agent` process from the `site-agent-*` crates:
//! two atomic gRPC clients, the credential bootstrap manager, the
//! per-kind resource managers wired into a [`ManagerRegistry`], the
//! workflow engine adapter, the reconcile engine + cron scheduler, and
//! the health/metrics HTTP surface.
//!
//! `main.rs` is intentionally thin — it parses CLI flags, loads the
//! layered config, and calls [`run`]. Everything that can be exercised
//! without a real process (construction, wiring, shutdown ordering)
//! lives here instead so it's reachable from tests.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use site_agent_bootstrap::CredentialBootstrapManager;
use site_agent_config::SiteAgentConfig;
use site_agent_core::{ResourceKind, SiteId};
use site_agent_grpc::{CloudClient, MachineClient, RackClient, ReinitializableClient};
use site_agent_health::{router, HealthCache, MetricsRegistry};
use site_agent_managers::{
    DpuExtensionServiceManager, ExpectedMachineManager, InfiniBandPartitionManager, InstanceManager,
    InstanceTypeManager, MachineManager, ManagerRegistry, ManagerRegistryBuilder, NetworkSecurityGroupManager,
    NvLinkLogicalPartitionManager, OperatingSystemManager, RackManager, ResourceManager, SkuManager,
    SshKeyGroupManager, SubnetManager, TenantManager, TrayManager, VpcManager,
};
use site_agent_reconciler::{CloudPager, CronScheduler, ReconcileEngine, SitePager};
use site_agent_workflow::{Orchestrator, RetryPolicyConfig, WorkflowEngineAdapter, WorkflowEngineHandle};
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Everything constructed at startup, held alive for the process lifetime.
/// Exists as a named struct (rather than only local variables in `run`) so
/// integration tests can build one against loopback endpoints and drive
/// individual pieces without going through `main`.
pub struct SiteAgent {
    config: SiteAgentConfig,
    health: Arc<HealthCache>,
    metrics: Arc<MetricsRegistry>,
    registry: Arc<ManagerRegistry>,
    bootstrap: Arc<CredentialBootstrapManager>,
    adapter: Arc<WorkflowEngineAdapter>,
    reconcile: Arc<ReconcileEngine>,
}

impl SiteAgent {
    /// Builds every component and wires them together, but starts nothing —
    /// no task is spawned, no port is bound. `spawn_and_run` (or a test)
    /// decides what actually runs.
    pub fn build(config: SiteAgentConfig) -> anyhow::Result<Self> {
        let site_id = SiteId::new(config.site_id.clone());
        let health = HealthCache::new();
        let metrics = MetricsRegistry::new();

        let machine_client = Arc::new(MachineClient::new(config.machine_controller_addr.clone()).with_health(health.clone()));
        let rack_client = Arc::new(RackClient::new(config.rack_controller_addr.clone()).with_health(health.clone()));
        let cloud_client = Arc::new(CloudClient::new(config.cloud_catalog_addr.clone()).with_health(health.clone()));

        let vpc = Arc::new(VpcManager::new(machine_client.clone()));
        let subnet = Arc::new(SubnetManager::new(machine_client.clone()));
        let instance = Arc::new(InstanceManager::new(machine_client.clone()));
        let machine = Arc::new(MachineManager::new(machine_client.clone()));
        let expected_machine = Arc::new(ExpectedMachineManager::new(machine_client.clone()));
        let instance_type = Arc::new(InstanceTypeManager::new(machine_client.clone()));
        let infiniband_partition = Arc::new(InfiniBandPartitionManager::new(machine_client.clone()));
        let nvlink_partition = Arc::new(NvLinkLogicalPartitionManager::new(machine_client.clone()));
        let ssh_key_group = Arc::new(SshKeyGroupManager::new(machine_client.clone()));
        let operating_system = Arc::new(OperatingSystemManager::new(machine_client.clone()));
        let network_security_group = Arc::new(NetworkSecurityGroupManager::new(machine_client.clone()));
        let dpu_extension_service = Arc::new(DpuExtensionServiceManager::new(machine_client.clone()));
        let tenant = Arc::new(TenantManager::new(machine_client.clone()));
        let sku = Arc::new(SkuManager::new(machine_client.clone()));
        let tray = Arc::new(TrayManager::new(rack_client.clone()));
        let rack = Arc::new(RackManager::new(rack_client.clone()));

        let registry = ManagerRegistryBuilder::new()
            .register(vpc.clone())
            .register(subnet.clone())
            .register(instance.clone())
            .register(machine.clone())
            .register(expected_machine.clone())
            .register(instance_type.clone())
            .register(infiniband_partition.clone())
            .register(nvlink_partition.clone())
            .register(ssh_key_group.clone())
            .register(operating_system.clone())
            .register(network_security_group.clone())
            .register(dpu_extension_service.clone())
            .register(tenant.clone())
            .register(sku.clone())
            .register(tray.clone())
            .register(rack.clone())
            .build()
            .context("manager registry incomplete at startup")?;

        for manager in registry.all() {
            metrics.register_kind(manager.kind(), manager.counters_handle());
        }

        let clients: Vec<Arc<dyn ReinitializableClient>> =
            vec![machine_client.clone(), rack_client.clone(), cloud_client.clone()];
        let bootstrap = Arc::new(CredentialBootstrapManager::new(
            site_id.clone(),
            config.bootstrap_endpoint.clone(),
            config.config_dir.clone(),
            config.is_master,
            clients,
        ));

        let engine_handle = WorkflowEngineHandle::connect_lazy(config.workflow_engine_addr.clone())
            .context("failed to construct workflow engine channel")?;

        let retry = RetryPolicyConfig {
            initial_interval_ms: config.retry.initial_interval_ms,
            backoff_coefficient: config.retry.backoff_coefficient,
            max_interval_ms: config.retry.max_interval_ms,
            max_attempts: config.retry.max_attempts_interactive,
        };

        let orchestrator = Arc::new(
            Orchestrator::new(registry.clone(), engine_handle.clone(), config.publish_queue.clone())
                .with_metrics(metrics.clone()),
        );

        let otp_bootstrap = config.is_master.then(|| bootstrap.clone());
        let adapter = Arc::new(WorkflowEngineAdapter::new(
            engine_handle,
            registry.clone(),
            orchestrator.clone(),
            config.subscribe_queue.clone(),
            format!("{}-worker", site_id.as_str()),
            retry,
            config.inventory_activity_timeout(),
            otp_bootstrap,
        ));

        let cloud_pager = CloudPager::new(cloud_client.clone());
        let site_pagers = vec![
            SitePager::Vpc(vpc),
            SitePager::Subnet(subnet),
            SitePager::Instance(instance),
            SitePager::Machine(machine),
            SitePager::ExpectedMachine(expected_machine),
            SitePager::InstanceType(instance_type),
            SitePager::InfiniBandPartition(infiniband_partition),
            SitePager::NvLinkLogicalPartition(nvlink_partition),
            SitePager::SshKeyGroup(ssh_key_group),
            SitePager::OperatingSystem(operating_system),
            SitePager::NetworkSecurityGroup(network_security_group),
            SitePager::DpuExtensionService(dpu_extension_service),
            SitePager::Tenant(tenant),
            SitePager::Sku(sku),
            SitePager::Tray(tray),
            SitePager::Rack(rack),
        ];

        let reconcile = Arc::new(ReconcileEngine::new(
            site_id.as_str().to_string(),
            cloud_pager,
            site_pagers,
            orchestrator,
            registry.clone(),
            retry,
            config.reconcile.clone(),
            health.clone(),
        ));

        Ok(Self {
            config,
            health,
            metrics,
            registry,
            bootstrap,
            adapter,
            reconcile,
        })
    }

    pub fn health(&self) -> Arc<HealthCache> {
        self.health.clone()
    }

    pub fn registry(&self) -> Arc<ManagerRegistry> {
        self.registry.clone()
    }

    /// Brings credentials online (first-boot OTP exchange, or a reload from
    /// an already-provisioned `certs/` directory), then
    /// spawns every long-running task and serves the health/metrics surface
    /// until `cancel` fires.
    pub async fn run(self, otp: Option<String>, cancel: CancellationToken) -> anyhow::Result<()> {
        self.bring_up_credentials(otp).await?;

        let intervals: Vec<(ResourceKind, Duration)> = ResourceKind::iter()
            .map(|kind| (kind, self.config.reconcile.interval_for(kind.as_str())))
            .collect();
        let cron = CronScheduler::new(self.reconcile.clone(), intervals);

        let mut tasks = Vec::new();

        if !self.bootstrap.is_master() {
            let bootstrap = self.bootstrap.clone();
            tasks.push(tokio::spawn(async move {
                bootstrap.watch_for_rotation(Duration::from_secs(30)).await;
            }));
        }

        {
            let adapter = self.adapter.clone();
            let cancel = cancel.clone();
            tasks.push(tokio::spawn(async move { adapter.run(cancel).await }));
        }

        {
            let cancel = cancel.clone();
            tasks.push(tokio::spawn(async move { cron.run(cancel).await }));
        }

        let health_listener = tokio::net::TcpListener::bind(&self.config.health_bind_address)
            .await
            .with_context(|| format!("failed to bind health address {}", self.config.health_bind_address))?;
        let app = router(self.health.clone(), self.metrics.clone());
        info!(address = %self.config.health_bind_address, "health/metrics surface listening");
        let serve_cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            let _ = axum::serve(health_listener, app)
                .with_graceful_shutdown(async move { serve_cancel.cancelled().await })
                .await;
        }));

        for task in tasks {
            let _ = task.await;
        }
        Ok(())
    }

    /// First boot: no `certs/` directory yet, an OTP must be supplied (via
    /// `--otp`/`SITE_OTP` or a master-only `ReceiveAndSaveOTP` workflow
    /// delivery later). Every subsequent boot reloads from disk.
    async fn bring_up_credentials(&self, otp: Option<String>) -> anyhow::Result<()> {
        if self.bootstrap.reinitialize_from_disk().await.is_ok() {
            info!(site_id = %self.config.site_id, "reloaded existing credentials from disk");
            return Ok(());
        }

        match otp {
            Some(otp) => {
                self.bootstrap
                    .download_and_store_creds(Some(otp))
                    .await
                    .context("first-boot credential bootstrap failed")?;
                Ok(())
            }
            None => {
                info!(
                    site_id = %self.config.site_id,
                    "no credentials on disk and no OTP supplied; awaiting ReceiveAndSaveOTP from the Cloud"
                );
                Ok(())
            }
        }
    }
}

/// Entry point called by `main.rs`.
pub async fn run(config: SiteAgentConfig, otp: Option<String>) -> anyhow::Result<()> {
    let agent = SiteAgent::build(config)?;
    let cancel = CancellationToken::new();
    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown_cancel.cancel();
    });
    agent.run(otp, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_wires_all_sixteen_managers_against_loopback_config() {
        let mut config = SiteAgentConfig::default();
        config.site_id = "test-site".to_string();

        let agent = SiteAgent::build(config).expect("construction only dials lazily, never eagerly");
        assert_eq!(agent.registry().all().count(), ResourceKind::iter().count());
    }

    #[test]
    fn non_master_build_does_not_register_otp_workflow() {
        let mut config = SiteAgentConfig::default();
        config.site_id = "test-site".to_string();
        config.is_master = false;

        // Construction must succeed identically regardless of master status;
        // the only difference is whether `run` spawns the rotation watcher
        // vs. registers the OTP workflow with the adapter.
        let agent = SiteAgent::build(config).expect("non-master construction still succeeds");
        assert!(!agent.bootstrap.is_master());
    }
}
