//! The ExpectedMachine manager: unlike `Machine` (discovered, read-only),
//! an ExpectedMachine is a Cloud-declared intent — "a machine with this
//! serial should show up here" — so it gets full CRUD through the generic
//! envelope.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use site_agent_core::{ActivityCounters, ResourceKind, SiteAgentResult};
use site_agent_grpc::MachineClient;
use site_agent_proto::machine::{CreateResourceRequest, DeleteResourceRequest, ListResourcesRequest, ListResourcesResponse, UpdateResourceRequest};

use crate::activity::{run_activity, unsupported_activity};
use crate::manager::{ActivityContext, CronRegistration, PublisherRegistration, ResourceManager, SubscriberRegistration};

pub struct ExpectedMachineManager {
    client: Arc<MachineClient>,
    counters: Arc<ActivityCounters>,
}

impl ExpectedMachineManager {
    pub fn new(client: Arc<MachineClient>) -> Self {
        Self {
            client,
            counters: Arc::new(ActivityCounters::new()),
        }
    }

    pub async fn list_site(&self, page_token: String, page_size: i32) -> SiteAgentResult<ListResourcesResponse> {
        self.client
            .call("ListExpectedMachines", |mut c| async move {
                c.list_expected_machines(ListResourcesRequest {
                    kind: "expected_machine".to_string(),
                    page_token,
                    page_size,
                })
                .await
            })
            .await
    }
}

#[async_trait]
impl ResourceManager for ExpectedMachineManager {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ExpectedMachine
    }

    fn counters(&self) -> &ActivityCounters {
        &self.counters
    }

    fn counters_handle(&self) -> Arc<ActivityCounters> {
        self.counters.clone()
    }

    fn register_subscriber(&self) -> SubscriberRegistration {
        SubscriberRegistration {
            workflow_names: vec!["CreateExpectedMachine", "UpdateExpectedMachine", "DeleteExpectedMachine"],
        }
    }

    fn register_publisher(&self) -> Option<PublisherRegistration> {
        Some(PublisherRegistration {
            workflow_name: "DiscoverExpectedMachineInventory",
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
            "CreateExpectedMachine" => {
                run_activity::<CreateResourceRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move {
                        client
                            .call("CreateExpectedMachine", |mut c| async move { c.create_expected_machine(req).await })
                            .await
                    },
                )
                .await
            }
            "UpdateExpectedMachine" => {
                run_activity::<UpdateResourceRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move {
                        client
                            .call("UpdateExpectedMachine", |mut c| async move { c.update_expected_machine(req).await })
                            .await
                    },
                )
                .await
            }
            "DeleteExpectedMachine" => {
                run_activity::<DeleteResourceRequest, _, _, _>(
                    &self.counters,
                    self.kind(),
                    name,
                    payload,
                    ctx.deadline,
                    |req| async move {
                        client
                            .call("DeleteExpectedMachine", |mut c| async move { c.delete_expected_machine(req).await })
                            .await
                    },
                )
                .await
            }
            other => Err(unsupported_activity(self.kind(), other)),
        }
    }
}
