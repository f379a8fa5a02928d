//! Generic-envelope managers: every kind whose machine-controller wire
//! shape is `GenericResource` rather than a dedicated message — catalog
//! data, tenancy/security objects, fabric partitions. One macro generates
//! the repetitive create/update/delete/list
//! wiring per kind instead of hand-copying the same five methods nine
//! times; the *behavior* (activity pattern, counters, policy lookup) is
//! identical to `VpcManager`/`SubnetManager` — only the RPC names differ.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use site_agent_core::{ActivityCounters, ResourceKind, SiteAgentResult};
use site_agent_grpc::MachineClient;
use site_agent_proto::machine::{
    CreateResourceRequest, DeleteResourceRequest, ListResourcesRequest, ListResourcesResponse, UpdateResourceRequest,
};

use crate::activity::{run_activity, unsupported_activity};
use crate::manager::{ActivityContext, CronRegistration, PublisherRegistration, ResourceManager, SubscriberRegistration};

/// Generates a `ResourceManager` for a kind with full create/update/delete.
macro_rules! generic_manager_crud {
    (
        $struct_name:ident,
        kind = $kind_variant:ident,
        kind_str = $kind_str:literal,
        create_activity = $create_activity:literal, create_method = $create_method:ident, create_rpc = $create_rpc:literal,
        update_activity = $update_activity:literal, update_method = $update_method:ident, update_rpc = $update_rpc:literal,
        delete_activity = $delete_activity:literal, delete_method = $delete_method:ident, delete_rpc = $delete_rpc:literal,
        list_method = $list_method:ident, list_rpc = $list_rpc:literal,
        publish_workflow = $publish_wf:literal,
        interval_secs = $interval:expr,
    ) => {
        pub struct $struct_name {
            client: Arc<MachineClient>,
            counters: Arc<ActivityCounters>,
        }

        impl $struct_name {
            pub fn new(client: Arc<MachineClient>) -> Self {
                Self {
                    client,
                    counters: Arc::new(ActivityCounters::new()),
                }
            }

            pub async fn list_site(&self, page_token: String, page_size: i32) -> SiteAgentResult<ListResourcesResponse> {
                self.client
                    .call($list_rpc, |mut c| async move {
                        c.$list_method(ListResourcesRequest {
                            kind: $kind_str.to_string(),
                            page_token,
                            page_size,
                        })
                        .await
                    })
                    .await
            }
        }

        #[async_trait]
        impl ResourceManager for $struct_name {
            fn kind(&self) -> ResourceKind {
                ResourceKind::$kind_variant
            }

            fn counters(&self) -> &ActivityCounters {
                &self.counters
            }

            fn counters_handle(&self) -> Arc<ActivityCounters> {
                self.counters.clone()
            }

            fn register_subscriber(&self) -> SubscriberRegistration {
                SubscriberRegistration {
                    workflow_names: vec![$create_activity, $update_activity, $delete_activity],
                }
            }

            fn register_publisher(&self) -> Option<PublisherRegistration> {
                Some(PublisherRegistration { workflow_name: $publish_wf })
            }

            fn register_cron(&self) -> Option<CronRegistration> {
                Some(CronRegistration {
                    default_interval: Duration::from_secs($interval),
                })
            }

            async fn activity(&self, name: &str, ctx: ActivityContext, payload: Vec<u8>) -> SiteAgentResult<Vec<u8>> {
                let client = self.client.clone();
                match name {
                    $create_activity => {
                        run_activity::<CreateResourceRequest, _, _, _>(
                            &self.counters,
                            self.kind(),
                            name,
                            payload,
                            ctx.deadline,
                            |req| async move { client.call($create_rpc, |mut c| async move { c.$create_method(req).await }).await },
                        )
                        .await
                    }
                    $update_activity => {
                        run_activity::<UpdateResourceRequest, _, _, _>(
                            &self.counters,
                            self.kind(),
                            name,
                            payload,
                            ctx.deadline,
                            |req| async move { client.call($update_rpc, |mut c| async move { c.$update_method(req).await }).await },
                        )
                        .await
                    }
                    $delete_activity => {
                        run_activity::<DeleteResourceRequest, _, _, _>(
                            &self.counters,
                            self.kind(),
                            name,
                            payload,
                            ctx.deadline,
                            |req| async move { client.call($delete_rpc, |mut c| async move { c.$delete_method(req).await }).await },
                        )
                        .await
                    }
                    other => Err(unsupported_activity(self.kind(), other)),
                }
            }
        }
    };
}

/// Generates a `ResourceManager` for a kind that is only ever
/// created/deleted by the Cloud, never updated in place (fabric partitions,
/// SSH key groups, DPU extension services — the per-kind policy table
/// treats these as create-or-destroy, not drift-update, objects).
macro_rules! generic_manager_create_delete {
    (
        $struct_name:ident,
        kind = $kind_variant:ident,
        kind_str = $kind_str:literal,
        create_activity = $create_activity:literal, create_method = $create_method:ident, create_rpc = $create_rpc:literal,
        delete_activity = $delete_activity:literal, delete_method = $delete_method:ident, delete_rpc = $delete_rpc:literal,
        list_method = $list_method:ident, list_rpc = $list_rpc:literal,
        publish_workflow = $publish_wf:literal,
        interval_secs = $interval:expr,
    ) => {
        pub struct $struct_name {
            client: Arc<MachineClient>,
            counters: Arc<ActivityCounters>,
        }

        impl $struct_name {
            pub fn new(client: Arc<MachineClient>) -> Self {
                Self {
                    client,
                    counters: Arc::new(ActivityCounters::new()),
                }
            }

            pub async fn list_site(&self, page_token: String, page_size: i32) -> SiteAgentResult<ListResourcesResponse> {
                self.client
                    .call($list_rpc, |mut c| async move {
                        c.$list_method(ListResourcesRequest {
                            kind: $kind_str.to_string(),
                            page_token,
                            page_size,
                        })
                        .await
                    })
                    .await
            }
        }

        #[async_trait]
        impl ResourceManager for $struct_name {
            fn kind(&self) -> ResourceKind {
                ResourceKind::$kind_variant
            }

            fn counters(&self) -> &ActivityCounters {
                &self.counters
            }

            fn counters_handle(&self) -> Arc<ActivityCounters> {
                self.counters.clone()
            }

            fn register_subscriber(&self) -> SubscriberRegistration {
                SubscriberRegistration {
                    workflow_names: vec![$create_activity, $delete_activity],
                }
            }

            fn register_publisher(&self) -> Option<PublisherRegistration> {
                Some(PublisherRegistration { workflow_name: $publish_wf })
            }

            fn register_cron(&self) -> Option<CronRegistration> {
                Some(CronRegistration {
                    default_interval: Duration::from_secs($interval),
                })
            }

            async fn activity(&self, name: &str, ctx: ActivityContext, payload: Vec<u8>) -> SiteAgentResult<Vec<u8>> {
                let client = self.client.clone();
                match name {
                    $create_activity => {
                        run_activity::<CreateResourceRequest, _, _, _>(
                            &self.counters,
                            self.kind(),
                            name,
                            payload,
                            ctx.deadline,
                            |req| async move { client.call($create_rpc, |mut c| async move { c.$create_method(req).await }).await },
                        )
                        .await
                    }
                    $delete_activity => {
                        run_activity::<DeleteResourceRequest, _, _, _>(
                            &self.counters,
                            self.kind(),
                            name,
                            payload,
                            ctx.deadline,
                            |req| async move { client.call($delete_rpc, |mut c| async move { c.$delete_method(req).await }).await },
                        )
                        .await
                    }
                    other => Err(unsupported_activity(self.kind(), other)),
                }
            }
        }
    };
}

generic_manager_crud!(
    InstanceTypeManager,
    kind = InstanceType,
    kind_str = "instance_type",
    create_activity = "CreateInstanceType", create_method = create_instance_type, create_rpc = "CreateInstanceType",
    update_activity = "UpdateInstanceType", update_method = update_instance_type, update_rpc = "UpdateInstanceType",
    delete_activity = "DeleteInstanceType", delete_method = delete_instance_type, delete_rpc = "DeleteInstanceType",
    list_method = list_instance_types, list_rpc = "ListInstanceTypes",
    publish_workflow = "DiscoverInstanceTypeInventory",
    interval_secs = 300,
);

generic_manager_crud!(
    SkuManager,
    kind = Sku,
    kind_str = "sku",
    create_activity = "CreateSKU", create_method = create_sku, create_rpc = "CreateSku",
    update_activity = "UpdateSKU", update_method = update_sku, update_rpc = "UpdateSku",
    delete_activity = "DeleteSKU", delete_method = delete_sku, delete_rpc = "DeleteSku",
    list_method = list_skus, list_rpc = "ListSkus",
    publish_workflow = "DiscoverSkuInventory",
    interval_secs = 300,
);

generic_manager_crud!(
    OperatingSystemManager,
    kind = OperatingSystem,
    kind_str = "operating_system",
    create_activity = "CreateOperatingSystem", create_method = create_operating_system, create_rpc = "CreateOperatingSystem",
    update_activity = "UpdateOperatingSystem", update_method = update_operating_system, update_rpc = "UpdateOperatingSystem",
    delete_activity = "DeleteOperatingSystem", delete_method = delete_operating_system, delete_rpc = "DeleteOperatingSystem",
    list_method = list_operating_systems, list_rpc = "ListOperatingSystems",
    publish_workflow = "DiscoverOperatingSystemInventory",
    interval_secs = 300,
);

generic_manager_crud!(
    NetworkSecurityGroupManager,
    kind = NetworkSecurityGroup,
    kind_str = "network_security_group",
    create_activity = "CreateNetworkSecurityGroup", create_method = create_network_security_group, create_rpc = "CreateNetworkSecurityGroup",
    update_activity = "UpdateNetworkSecurityGroup", update_method = update_network_security_group, update_rpc = "UpdateNetworkSecurityGroup",
    delete_activity = "DeleteNetworkSecurityGroup", delete_method = delete_network_security_group, delete_rpc = "DeleteNetworkSecurityGroup",
    list_method = list_network_security_groups, list_rpc = "ListNetworkSecurityGroups",
    publish_workflow = "DiscoverNetworkSecurityGroupInventory",
    interval_secs = 120,
);

generic_manager_crud!(
    TenantManager,
    kind = Tenant,
    kind_str = "tenant",
    create_activity = "CreateTenant", create_method = create_tenant, create_rpc = "CreateTenant",
    update_activity = "UpdateTenant", update_method = update_tenant, update_rpc = "UpdateTenant",
    delete_activity = "DeleteTenant", delete_method = delete_tenant, delete_rpc = "DeleteTenant",
    list_method = list_tenants, list_rpc = "ListTenants",
    publish_workflow = "DiscoverTenantInventory",
    interval_secs = 300,
);

generic_manager_create_delete!(
    SshKeyGroupManager,
    kind = SshKeyGroup,
    kind_str = "ssh_key_group",
    create_activity = "CreateSSHKeyGroup", create_method = create_ssh_key_group, create_rpc = "CreateSshKeyGroup",
    delete_activity = "DeleteSSHKeyGroup", delete_method = delete_ssh_key_group, delete_rpc = "DeleteSshKeyGroup",
    list_method = list_ssh_key_groups, list_rpc = "ListSshKeyGroups",
    publish_workflow = "DiscoverSshKeyGroupInventory",
    interval_secs = 120,
);

generic_manager_create_delete!(
    InfiniBandPartitionManager,
    kind = InfiniBandPartition,
    kind_str = "infiniband_partition",
    create_activity = "CreateInfiniBandPartition", create_method = create_infini_band_partition, create_rpc = "CreateInfiniBandPartition",
    delete_activity = "DeleteInfiniBandPartition", delete_method = delete_infini_band_partition, delete_rpc = "DeleteInfiniBandPartition",
    list_method = list_infini_band_partitions, list_rpc = "ListInfiniBandPartitions",
    publish_workflow = "DiscoverInfiniBandPartitionInventory",
    interval_secs = 120,
);

generic_manager_create_delete!(
    NvLinkLogicalPartitionManager,
    kind = NvLinkLogicalPartition,
    kind_str = "nvlink_logical_partition",
    create_activity = "CreateNVLinkLogicalPartition", create_method = create_nv_link_logical_partition, create_rpc = "CreateNvLinkLogicalPartition",
    delete_activity = "DeleteNVLinkLogicalPartition", delete_method = delete_nv_link_logical_partition, delete_rpc = "DeleteNvLinkLogicalPartition",
    list_method = list_nv_link_logical_partitions, list_rpc = "ListNvLinkLogicalPartitions",
    publish_workflow = "DiscoverNvLinkLogicalPartitionInventory",
    interval_secs = 120,
);

generic_manager_create_delete!(
    DpuExtensionServiceManager,
    kind = DpuExtensionService,
    kind_str = "dpu_extension_service",
    create_activity = "CreateDPUExtensionService", create_method = create_dpu_extension_service, create_rpc = "CreateDpuExtensionService",
    delete_activity = "DeleteDPUExtensionService", delete_method = delete_dpu_extension_service, delete_rpc = "DeleteDpuExtensionService",
    list_method = list_dpu_extension_services, list_rpc = "ListDpuExtensionServices",
    publish_workflow = "DiscoverDpuExtensionServiceInventory",
    interval_secs = 120,
);
