//! The Subnet manager — one level below VPC in the machine controller's
//! network object graph, otherwise structurally identical.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use site_agent_core::{ActivityCounters, ResourceKind, SiteAgentResult};
use site_agent_grpc::MachineClient;
use site_agent_proto::machine::{
    CreateSubnetRequest, DeleteResourceRequest, ListResourcesRequest, ListSubnetsResponse, UpdateSubnetRequest,
};

use crate::activity::{run_activity, unsupported_activity};
use crate::manager::{ActivityContext, CronRegistration, PublisherRegistration, ResourceManager, SubscriberRegistration};

pub struct SubnetManager {
    client: Arc<MachineClient>,
    counters: Arc<ActivityCounters>,
}

impl SubnetManager {
    pub fn new(client: Arc<MachineClient>) -> Self {
        Self {
            client,
            counters: Arc::new(ActivityCounters::new()),
        }
    }

    pub async fn list_site(&self, page_token: String, page_size: i32) -> SiteAgentResult<ListSubnetsResponse> {
        self.client
            .call("ListSubnets", |mut c| async move {
                c.list_subnets(ListResourcesRequest {
                    kind: "subnet".to_string(),
                    page_token,
                    page_size,
                })
                .await
            })
            .await
    }
}

#[async_trait]
impl ResourceManager for SubnetManager {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Subnet
    }

    fn counters(&self) -> &ActivityCounters {
        &self.counters
    }

    fn counters_handle(&self) -> Arc<ActivityCounters> {
        self.counters.clone()
    }

    fn register_subscriber(&self) -> SubscriberRegistration {
        SubscriberRegistration {
            workflow_names: vec!["CreateSubnet", "UpdateSubnet", "DeleteSubnet"],
        }
    }

    fn register_publisher(&self) -> Option<PublisherRegistration> {
        Some(PublisherRegistration {
            workflow_name: "DiscoverSubnetInventory",
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
            "CreateSubnet" => {
                run_activity::<CreateSubnetRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("CreateSubnet", |mut c| async move { c.create_subnet(req).await }).await },
                )
                .await
            }
            "UpdateSubnet" => {
                run_activity::<UpdateSubnetRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("UpdateSubnet", |mut c| async move { c.update_subnet(req).await }).await },
                )
                .await
            }
            "DeleteSubnet" => {
                run_activity::<DeleteResourceRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("DeleteSubnet", |mut c| async move { c.delete_subnet(req).await }).await },
                )
                .await
            }
            other => Err(unsupported_activity(self.kind(), other)),
        }
    }
}
