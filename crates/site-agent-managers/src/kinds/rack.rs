//! The Rack manager: topology, firmware, and power operations against the
//! rack controller. Several of its activities return a
//! `TaskId` that the caller polls via `ListTasks` rather than completing
//! synchronously — the same async-completion shape as `InvokeInstancePower`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use site_agent_core::{ActivityCounters, ResourceKind, SiteAgentResult};
use site_agent_grpc::RackClient;
use site_agent_proto::rack::{
    AttachRacksToNvlDomainRequest, CreateNvlDomainRequest, GetListOfRacksRequest, GetListOfRacksResponse,
    RackPowerRequest, UpgradeFirmwareRequest, ValidateComponentsRequest,
};

use crate::activity::{run_activity, unsupported_activity};
use crate::manager::{ActivityContext, CronRegistration, PublisherRegistration, ResourceManager, SubscriberRegistration};

pub struct RackManager {
    client: Arc<RackClient>,
    counters: Arc<ActivityCounters>,
}

impl RackManager {
    pub fn new(client: Arc<RackClient>) -> Self {
        Self {
            client,
            counters: Arc::new(ActivityCounters::new()),
        }
    }

    pub async fn list_site(&self, page_token: String, page_size: i32) -> SiteAgentResult<GetListOfRacksResponse> {
        self.client
            .call("GetListOfRacks", |mut c| async move { c.get_list_of_racks(GetListOfRacksRequest { page_token, page_size }).await })
            .await
    }
}

#[async_trait]
impl ResourceManager for RackManager {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Rack
    }

    fn counters(&self) -> &ActivityCounters {
        &self.counters
    }

    fn counters_handle(&self) -> Arc<ActivityCounters> {
        self.counters.clone()
    }

    fn register_subscriber(&self) -> SubscriberRegistration {
        SubscriberRegistration {
            workflow_names: vec![
                "UpgradeFirmware",
                "PowerOnRack",
                "PowerOffRack",
                "PowerResetRack",
                "ValidateComponents",
                "CreateNvlDomain",
                "AttachRacksToNvlDomain",
            ],
        }
    }

    fn register_publisher(&self) -> Option<PublisherRegistration> {
        Some(PublisherRegistration {
            workflow_name: "DiscoverRackInventory",
        })
    }

    fn register_cron(&self) -> Option<CronRegistration> {
        Some(CronRegistration {
            default_interval: Duration::from_secs(30),
        })
    }

    async fn activity(&self, name: &str, ctx: ActivityContext, payload: Vec<u8>) -> SiteAgentResult<Vec<u8>> {
        let client = self.client.clone();
        match name {
            "UpgradeFirmware" => {
                run_activity::<UpgradeFirmwareRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("UpgradeFirmware", |mut c| async move { c.upgrade_firmware(req).await }).await },
                )
                .await
            }
            "PowerOnRack" => {
                run_activity::<RackPowerRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("PowerOnRack", |mut c| async move { c.power_on_rack(req).await }).await },
                )
                .await
            }
            "PowerOffRack" => {
                run_activity::<RackPowerRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("PowerOffRack", |mut c| async move { c.power_off_rack(req).await }).await },
                )
                .await
            }
            "PowerResetRack" => {
                run_activity::<RackPowerRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("PowerResetRack", |mut c| async move { c.power_reset_rack(req).await }).await },
                )
                .await
            }
            "ValidateComponents" => {
                run_activity::<ValidateComponentsRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move {
                        client
                            .call("ValidateComponents", |mut c| async move { c.validate_components(req).await })
                            .await
                    },
                )
                .await
            }
            "CreateNvlDomain" => {
                run_activity::<CreateNvlDomainRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("CreateNvlDomain", |mut c| async move { c.create_nvl_domain(req).await }).await },
                )
                .await
            }
            "AttachRacksToNvlDomain" => {
                run_activity::<AttachRacksToNvlDomainRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move {
                        client
                            .call("AttachRacksToNvlDomain", |mut c| async move { c.attach_racks_to_nvl_domain(req).await })
                            .await
                    },
                )
                .await
            }
            other => Err(unsupported_activity(self.kind(), other)),
        }
    }
}
