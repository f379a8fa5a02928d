//! The VPC manager: the simplest full-CRUD kind, and the one the reconciler
//! boundary-scenario tests exercise directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use site_agent_core::{ActivityCounters, ResourceKind, SiteAgentResult};
use site_agent_grpc::MachineClient;
use site_agent_proto::machine::{CreateVpcRequest, DeleteVpcRequest, ListResourcesRequest, ListVpcsResponse, UpdateVpcRequest};

use crate::activity::{run_activity, unsupported_activity};
use crate::manager::{ActivityContext, CronRegistration, PublisherRegistration, ResourceManager, SubscriberRegistration};

pub struct VpcManager {
    client: Arc<MachineClient>,
    counters: Arc<ActivityCounters>,
}

impl VpcManager {
    pub fn new(client: Arc<MachineClient>) -> Self {
        Self {
            client,
            counters: Arc::new(ActivityCounters::new()),
        }
    }

    /// Used by the reconciler to page the site's current VPC catalog.
    pub async fn list_site(&self, page_token: String, page_size: i32) -> SiteAgentResult<ListVpcsResponse> {
        self.client
            .call("ListVpcs", |mut c| async move {
                c.list_vpcs(ListResourcesRequest {
                    kind: "vpc".to_string(),
                    page_token,
                    page_size,
                })
                .await
            })
            .await
    }
}

#[async_trait]
impl ResourceManager for VpcManager {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Vpc
    }

    fn counters(&self) -> &ActivityCounters {
        &self.counters
    }

    fn counters_handle(&self) -> Arc<ActivityCounters> {
        self.counters.clone()
    }

    fn register_subscriber(&self) -> SubscriberRegistration {
        SubscriberRegistration {
            workflow_names: vec!["CreateVPC", "UpdateVPC", "DeleteVPC"],
        }
    }

    fn register_publisher(&self) -> Option<PublisherRegistration> {
        Some(PublisherRegistration {
            workflow_name: "DiscoverVpcInventory",
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
            "CreateVPC" => {
                run_activity::<CreateVpcRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("CreateVpc", |mut c| async move { c.create_vpc(req).await }).await },
                )
                .await
            }
            "UpdateVPC" => {
                run_activity::<UpdateVpcRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("UpdateVpc", |mut c| async move { c.update_vpc(req).await }).await },
                )
                .await
            }
            "DeleteVPC" => {
                run_activity::<DeleteVpcRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("DeleteVpc", |mut c| async move { c.delete_vpc(req).await }).await },
                )
                .await
            }
            other => Err(unsupported_activity(self.kind(), other)),
        }
    }
}
