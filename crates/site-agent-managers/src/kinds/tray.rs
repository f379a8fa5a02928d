//! The Tray manager: the one kind the rack controller exposes no bulk list
//! for (`rack_controller.proto` only has `GetComponentInfoById`). Site
//! inventory is assembled by paging `Rack`s and resolving each rack's
//! `tray_site_ids` — the reconciler's `list_site` call for this kind costs
//! one rack page plus one lookup per tray, not a single RPC.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use site_agent_core::{ActivityCounters, ResourceKind, SiteAgentResult};
use site_agent_grpc::RackClient;
use site_agent_proto::rack::{GetComponentInfoByIdRequest, GetListOfRacksRequest, Tray};

use crate::activity::{run_activity, unsupported_activity};
use crate::manager::{ActivityContext, CronRegistration, PublisherRegistration, ResourceManager, SubscriberRegistration};

pub struct TrayManager {
    client: Arc<RackClient>,
    counters: Arc<ActivityCounters>,
}

/// Paged listing of trays, assembled client-side. `next_page_token` mirrors
/// the underlying rack page token: the reconciler keeps paging racks until
/// it is empty, even though a single rack page may contribute zero or many
/// trays.
pub struct TrayPage {
    pub trays: Vec<Tray>,
    pub next_page_token: String,
}

impl TrayManager {
    pub fn new(client: Arc<RackClient>) -> Self {
        Self {
            client,
            counters: Arc::new(ActivityCounters::new()),
        }
    }

    pub async fn list_site(&self, page_token: String, page_size: i32) -> SiteAgentResult<TrayPage> {
        let racks = self
            .client
            .call("GetListOfRacks", |mut c| async move { c.get_list_of_racks(GetListOfRacksRequest { page_token, page_size }).await })
            .await?;

        let mut trays = Vec::new();
        for rack in &racks.racks {
            for tray_site_id in &rack.tray_site_ids {
                let info = self
                    .client
                    .call("GetComponentInfoById", |mut c| {
                        let component_site_id = tray_site_id.clone();
                        async move { c.get_component_info_by_id(GetComponentInfoByIdRequest { component_site_id }).await }
                    })
                    .await?;
                if let Some(tray) = info.tray {
                    trays.push(tray);
                }
            }
        }

        Ok(TrayPage {
            trays,
            next_page_token: racks.next_page_token,
        })
    }
}

#[async_trait]
impl ResourceManager for TrayManager {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Tray
    }

    fn counters(&self) -> &ActivityCounters {
        &self.counters
    }

    fn counters_handle(&self) -> Arc<ActivityCounters> {
        self.counters.clone()
    }

    fn register_subscriber(&self) -> SubscriberRegistration {
        SubscriberRegistration { workflow_names: vec!["GetComponentInfoById"] }
    }

    fn register_publisher(&self) -> Option<PublisherRegistration> {
        Some(PublisherRegistration {
            workflow_name: "DiscoverTrayInventory",
        })
    }

    fn register_cron(&self) -> Option<CronRegistration> {
        Some(CronRegistration {
            default_interval: Duration::from_secs(60),
        })
    }

    async fn activity(&self, name: &str, ctx: ActivityContext, payload: Vec<u8>) -> SiteAgentResult<Vec<u8>> {
        let client = self.client.clone();
        match name {
            "GetComponentInfoById" => {
                run_activity::<GetComponentInfoByIdRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move {
                        client
                            .call("GetComponentInfoById", |mut c| async move { c.get_component_info_by_id(req).await })
                            .await
                    },
                )
                .await
            }
            other => Err(unsupported_activity(self.kind(), other)),
        }
    }
}
