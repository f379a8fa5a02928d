//! The Instance manager: full CRUD plus `InvokeInstancePower`, the one
//! asynchronous machine-controller operation that returns a `TaskId`
//! rather than completing synchronously.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use site_agent_core::{ActivityCounters, ResourceKind, SiteAgentResult};
use site_agent_grpc::MachineClient;
use site_agent_proto::machine::{
    CreateInstanceRequest, DeleteResourceRequest, InvokeInstancePowerRequest, ListInstancesResponse,
    ListResourcesRequest, UpdateInstanceRequest,
};

use crate::activity::{run_activity, unsupported_activity};
use crate::manager::{ActivityContext, CronRegistration, PublisherRegistration, ResourceManager, SubscriberRegistration};

pub struct InstanceManager {
    client: Arc<MachineClient>,
    counters: Arc<ActivityCounters>,
}

impl InstanceManager {
    pub fn new(client: Arc<MachineClient>) -> Self {
        Self {
            client,
            counters: Arc::new(ActivityCounters::new()),
        }
    }

    pub async fn list_site(&self, page_token: String, page_size: i32) -> SiteAgentResult<ListInstancesResponse> {
        self.client
            .call("ListInstances", |mut c| async move {
                c.list_instances(ListResourcesRequest {
                    kind: "instance".to_string(),
                    page_token,
                    page_size,
                })
                .await
            })
            .await
    }
}

#[async_trait]
impl ResourceManager for InstanceManager {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Instance
    }

    fn counters(&self) -> &ActivityCounters {
        &self.counters
    }

    fn counters_handle(&self) -> Arc<ActivityCounters> {
        self.counters.clone()
    }

    fn register_subscriber(&self) -> SubscriberRegistration {
        SubscriberRegistration {
            workflow_names: vec!["CreateInstance", "UpdateInstance", "DeleteInstance", "InvokeInstancePower"],
        }
    }

    fn register_publisher(&self) -> Option<PublisherRegistration> {
        Some(PublisherRegistration {
            workflow_name: "DiscoverInstanceInventory",
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
            "CreateInstance" => {
                run_activity::<CreateInstanceRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("CreateInstance", |mut c| async move { c.create_instance(req).await }).await },
                )
                .await
            }
            "UpdateInstance" => {
                run_activity::<UpdateInstanceRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("UpdateInstance", |mut c| async move { c.update_instance(req).await }).await },
                )
                .await
            }
            "DeleteInstance" => {
                run_activity::<DeleteResourceRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move { client.call("DeleteInstance", |mut c| async move { c.delete_instance(req).await }).await },
                )
                .await
            }
            "InvokeInstancePower" => {
                run_activity::<InvokeInstancePowerRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move {
                        client
                            .call("InvokeInstancePower", |mut c| async move { c.invoke_instance_power(req).await })
                            .await
                    },
                )
                .await
            }
            other => Err(unsupported_activity(self.kind(), other)),
        }
    }
}
