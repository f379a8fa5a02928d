//! The Machine manager: discovery-only physical inventory. The machine
//! controller is the source of truth for which machines
//! exist — the Site Agent never creates or deletes one, only relays status
//! transitions the Cloud asks for (e.g. marking a machine `Orphaned` once
//! the reconciler confirms it is gone from the Cloud side) and reports the
//! discovered set upward on the inventory cron.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use site_agent_core::{ActivityCounters, ResourceKind, SiteAgentResult};
use site_agent_grpc::MachineClient;
use site_agent_proto::machine::{ListResourcesRequest, ListResourcesResponse, UpdateResourceRequest};

use crate::activity::{run_activity, unsupported_activity};
use crate::manager::{ActivityContext, CronRegistration, PublisherRegistration, ResourceManager, SubscriberRegistration};

pub struct MachineManager {
    client: Arc<MachineClient>,
    counters: Arc<ActivityCounters>,
}

impl MachineManager {
    pub fn new(client: Arc<MachineClient>) -> Self {
        Self {
            client,
            counters: Arc::new(ActivityCounters::new()),
        }
    }

    pub async fn list_site(&self, page_token: String, page_size: i32) -> SiteAgentResult<ListResourcesResponse> {
        self.client
            .call("ListMachines", |mut c| async move {
                c.list_machines(ListResourcesRequest {
                    kind: "machine".to_string(),
                    page_token,
                    page_size,
                })
                .await
            })
            .await
    }
}

#[async_trait]
impl ResourceManager for MachineManager {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Machine
    }

    fn counters(&self) -> &ActivityCounters {
        &self.counters
    }

    fn counters_handle(&self) -> Arc<ActivityCounters> {
        self.counters.clone()
    }

    fn register_subscriber(&self) -> SubscriberRegistration {
        SubscriberRegistration {
            workflow_names: vec!["UpdateMachine"],
        }
    }

    fn register_publisher(&self) -> Option<PublisherRegistration> {
        Some(PublisherRegistration {
            workflow_name: "DiscoverMachineInventory",
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
            "UpdateMachine" => {
                run_activity::<UpdateResourceRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("UpdateMachine", |mut c| async move { c.update_machine(req).await }).await },
                )
                .await
            }
            other => Err(unsupported_activity(self.kind(), other)),
        }
    }
}
