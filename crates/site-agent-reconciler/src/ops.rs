//! Per-kind reconcile operations: which workflow names apply drift, and
//! how to build the request payload for each.
//!
//! `Option<&'static str>` rather than a bare name: `Tray` and `Rack` have
//! no Create/Update/Delete RPC at all (`rack_controller.proto` only exposes
//! topology/firmware/power operations), so drift on those two kinds is
//! reported upward through the discovery publisher instead of applied here.

use std::collections::BTreeMap;

use prost::Message;
use site_agent_core::{ResourceKind, TransactionId};
use site_agent_proto::common::{Label, TransactionId as ProtoTransactionId};
use site_agent_proto::machine::{
    CreateInstanceRequest, CreateResourceRequest, CreateSubnetRequest, CreateVpcRequest, DeleteResourceRequest,
    DeleteVpcRequest, GenericResource, Instance, Subnet, UpdateInstanceRequest, UpdateResourceRequest, UpdateSubnetRequest,
    UpdateVpcRequest, Vpc,
};

use crate::cloud::CloudEntry;

/// The status code the site controllers use for orphaned physical
/// inventory (`common.proto`'s `RESOURCE_STATUS_ORPHANED`).
pub const ORPHANED_STATUS: i32 = 6;

#[derive(Debug, Clone, Copy)]
pub struct ReconcileOps {
    pub create_workflow: Option<&'static str>,
    pub update_workflow: Option<&'static str>,
    pub delete_workflow: Option<&'static str>,
}

pub fn reconcile_ops(kind: ResourceKind) -> ReconcileOps {
    use ResourceKind::*;
    match kind {
        Vpc => ReconcileOps {
            create_workflow: Some("CreateVPC"),
            update_workflow: Some("UpdateVPC"),
            delete_workflow: Some("DeleteVPC"),
        },
        Subnet => ReconcileOps {
            create_workflow: Some("CreateSubnet"),
            update_workflow: Some("UpdateSubnet"),
            delete_workflow: Some("DeleteSubnet"),
        },
        Instance => ReconcileOps {
            create_workflow: Some("CreateInstance"),
            update_workflow: Some("UpdateInstance"),
            delete_workflow: Some("DeleteInstance"),
        },
        Machine => ReconcileOps {
            create_workflow: None,
            update_workflow: Some("UpdateMachine"),
            delete_workflow: None,
        },
        ExpectedMachine => ReconcileOps {
            create_workflow: Some("CreateExpectedMachine"),
            update_workflow: Some("UpdateExpectedMachine"),
            delete_workflow: Some("DeleteExpectedMachine"),
        },
        InstanceType => ReconcileOps {
            create_workflow: Some("CreateInstanceType"),
            update_workflow: Some("UpdateInstanceType"),
            delete_workflow: Some("DeleteInstanceType"),
        },
        Sku => ReconcileOps {
            create_workflow: Some("CreateSKU"),
            update_workflow: Some("UpdateSKU"),
            delete_workflow: Some("DeleteSKU"),
        },
        OperatingSystem => ReconcileOps {
            create_workflow: Some("CreateOperatingSystem"),
            update_workflow: Some("UpdateOperatingSystem"),
            delete_workflow: Some("DeleteOperatingSystem"),
        },
        NetworkSecurityGroup => ReconcileOps {
            create_workflow: Some("CreateNetworkSecurityGroup"),
            update_workflow: Some("UpdateNetworkSecurityGroup"),
            delete_workflow: Some("DeleteNetworkSecurityGroup"),
        },
        Tenant => ReconcileOps {
            create_workflow: Some("CreateTenant"),
            update_workflow: Some("UpdateTenant"),
            delete_workflow: Some("DeleteTenant"),
        },
        SshKeyGroup => ReconcileOps {
            create_workflow: Some("CreateSSHKeyGroup"),
            update_workflow: None,
            delete_workflow: Some("DeleteSSHKeyGroup"),
        },
        InfiniBandPartition => ReconcileOps {
            create_workflow: Some("CreateInfiniBandPartition"),
            update_workflow: None,
            delete_workflow: Some("DeleteInfiniBandPartition"),
        },
        NvLinkLogicalPartition => ReconcileOps {
            create_workflow: Some("CreateNVLinkLogicalPartition"),
            update_workflow: None,
            delete_workflow: Some("DeleteNVLinkLogicalPartition"),
        },
        DpuExtensionService => ReconcileOps {
            create_workflow: Some("CreateDPUExtensionService"),
            update_workflow: None,
            delete_workflow: Some("DeleteDPUExtensionService"),
        },
        Tray | Rack => ReconcileOps {
            create_workflow: None,
            update_workflow: None,
            delete_workflow: None,
        },
    }
}

fn labels_to_proto(labels: &BTreeMap<String, String>) -> Vec<Label> {
    labels.iter().map(|(k, v)| Label { key: k.clone(), value: v.clone() }).collect()
}

fn proto_txn(txn: TransactionId) -> ProtoTransactionId {
    ProtoTransactionId {
        resource_id: txn.resource_id.to_string(),
        timestamp: txn.timestamp,
    }
}

fn attr<'a>(entry: &'a CloudEntry, key: &str) -> &'a str {
    entry.attributes.get(key).map(String::as_str).unwrap_or("")
}

/// Builds the `Create*Request` payload for `kind` from the Cloud's view of
/// a missing-on-site resource. Returns `None` for kinds with no create
/// operation (`Tray`, `Rack`, `Machine`).
pub fn build_create_payload(kind: ResourceKind, txn: TransactionId, entry: &CloudEntry) -> Option<Vec<u8>> {
    use ResourceKind::*;
    let transaction_id = Some(proto_txn(txn));
    let labels = labels_to_proto(&entry.labels);

    let bytes = match kind {
        Vpc => CreateVpcRequest {
            transaction_id,
            vpc: Some(Vpc {
                cloud_id: entry.cloud_id.clone(),
                site_id: String::new(),
                name: entry.name.clone(),
                cidr_block: attr(entry, "cidr_block").to_string(),
                status: entry.status,
                version: entry.version,
                labels,
            }),
        }
        .encode_to_vec(),
        Subnet => CreateSubnetRequest {
            transaction_id,
            subnet: Some(Subnet {
                cloud_id: entry.cloud_id.clone(),
                site_id: String::new(),
                name: entry.name.clone(),
                vpc_cloud_id: entry.parent_cloud_id.clone(),
                cidr_block: attr(entry, "cidr_block").to_string(),
                status: entry.status,
                version: entry.version,
                labels,
            }),
        }
        .encode_to_vec(),
        Instance => CreateInstanceRequest {
            transaction_id,
            instance: Some(Instance {
                cloud_id: entry.cloud_id.clone(),
                site_id: String::new(),
                name: entry.name.clone(),
                subnet_cloud_id: entry.parent_cloud_id.clone(),
                instance_type_cloud_id: attr(entry, "instance_type_cloud_id").to_string(),
                operating_system_cloud_id: attr(entry, "operating_system_cloud_id").to_string(),
                status: entry.status,
                version: entry.version,
                labels,
            }),
        }
        .encode_to_vec(),
        ExpectedMachine | InstanceType | Sku | OperatingSystem | NetworkSecurityGroup | Tenant | SshKeyGroup
        | InfiniBandPartition | NvLinkLogicalPartition | DpuExtensionService => CreateResourceRequest {
            transaction_id,
            resource: Some(generic_resource(kind, entry, labels)),
        }
        .encode_to_vec(),
        Machine | Tray | Rack => return None,
    };
    Some(bytes)
}

/// Builds the `Update*Request` payload. `site_id` is the site-local
/// identifier recorded on the site's current copy, preserved across the
/// update rather than blanked.
pub fn build_update_payload(kind: ResourceKind, txn: TransactionId, site_id: &str, entry: &CloudEntry) -> Option<Vec<u8>> {
    use ResourceKind::*;
    let transaction_id = Some(proto_txn(txn));
    let labels = labels_to_proto(&entry.labels);

    let bytes = match kind {
        Vpc => UpdateVpcRequest {
            transaction_id,
            vpc: Some(Vpc {
                cloud_id: entry.cloud_id.clone(),
                site_id: site_id.to_string(),
                name: entry.name.clone(),
                cidr_block: attr(entry, "cidr_block").to_string(),
                status: entry.status,
                version: entry.version,
                labels,
            }),
        }
        .encode_to_vec(),
        Subnet => UpdateSubnetRequest {
            transaction_id,
            subnet: Some(Subnet {
                cloud_id: entry.cloud_id.clone(),
                site_id: site_id.to_string(),
                name: entry.name.clone(),
                vpc_cloud_id: entry.parent_cloud_id.clone(),
                cidr_block: attr(entry, "cidr_block").to_string(),
                status: entry.status,
                version: entry.version,
                labels,
            }),
        }
        .encode_to_vec(),
        Instance => UpdateInstanceRequest {
            transaction_id,
            instance: Some(Instance {
                cloud_id: entry.cloud_id.clone(),
                site_id: site_id.to_string(),
                name: entry.name.clone(),
                subnet_cloud_id: entry.parent_cloud_id.clone(),
                instance_type_cloud_id: attr(entry, "instance_type_cloud_id").to_string(),
                operating_system_cloud_id: attr(entry, "operating_system_cloud_id").to_string(),
                status: entry.status,
                version: entry.version,
                labels,
            }),
        }
        .encode_to_vec(),
        Machine | ExpectedMachine | InstanceType | Sku | OperatingSystem | NetworkSecurityGroup | Tenant => UpdateResourceRequest {
            transaction_id,
            resource: Some(generic_resource_with_site_id(kind, entry, labels, site_id)),
        }
        .encode_to_vec(),
        SshKeyGroup | InfiniBandPartition | NvLinkLogicalPartition | DpuExtensionService | Tray | Rack => return None,
    };
    Some(bytes)
}

/// Builds a status-only `Update*Request` marking a physical-inventory
/// resource orphaned (the `DeletePolicy::MarkOrphaned` path), reusing the
/// same wire shape as a normal update with `status` forced to
/// `ORPHANED_STATUS`.
pub fn build_mark_orphaned_payload(kind: ResourceKind, txn: TransactionId, site_id: &str, site_entry: &crate::site::SiteEntry) -> Option<Vec<u8>> {
    use ResourceKind::*;
    let transaction_id = Some(proto_txn(txn));
    let labels: Vec<Label> = site_entry.labels.iter().map(|(k, v)| Label { key: k.clone(), value: v.clone() }).collect();

    let bytes = match kind {
        Machine | ExpectedMachine => UpdateResourceRequest {
            transaction_id,
            resource: Some(GenericResource {
                kind: kind.as_str().to_string(),
                cloud_id: site_entry.cloud_id.clone(),
                site_id: site_id.to_string(),
                name: site_entry.name.clone(),
                parent_cloud_id: site_entry.parent_cloud_id.clone(),
                status: ORPHANED_STATUS,
                version: site_entry.version,
                labels,
                attributes: site_entry.attributes.clone().into_iter().collect(),
            }),
        }
        .encode_to_vec(),
        // Tray and Rack have no update RPC; marking them orphaned happens
        // only in the drift report the discovery publisher sends upward.
        Tray | Rack => return None,
        _ => return None,
    };
    Some(bytes)
}

pub fn build_delete_payload(kind: ResourceKind, txn: TransactionId, cloud_id: &str) -> Option<Vec<u8>> {
    use ResourceKind::*;
    let transaction_id = Some(proto_txn(txn));

    let bytes = match kind {
        Vpc => DeleteVpcRequest {
            transaction_id,
            cloud_id: cloud_id.to_string(),
        }
        .encode_to_vec(),
        ExpectedMachine | Subnet | Instance | InstanceType | Sku | OperatingSystem | NetworkSecurityGroup | Tenant
        | SshKeyGroup | InfiniBandPartition | NvLinkLogicalPartition | DpuExtensionService => DeleteResourceRequest {
            transaction_id,
            cloud_id: cloud_id.to_string(),
        }
        .encode_to_vec(),
        Machine | Tray | Rack => return None,
    };
    Some(bytes)
}

fn generic_resource(kind: ResourceKind, entry: &CloudEntry, labels: Vec<Label>) -> GenericResource {
    GenericResource {
        kind: kind.as_str().to_string(),
        cloud_id: entry.cloud_id.clone(),
        site_id: String::new(),
        name: entry.name.clone(),
        parent_cloud_id: entry.parent_cloud_id.clone(),
        status: entry.status,
        version: entry.version,
        labels,
        attributes: entry.attributes.clone().into_iter().collect(),
    }
}

fn generic_resource_with_site_id(kind: ResourceKind, entry: &CloudEntry, labels: Vec<Label>, site_id: &str) -> GenericResource {
    GenericResource {
        site_id: site_id.to_string(),
        ..generic_resource(kind, entry, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn txn() -> TransactionId {
        TransactionId {
            resource_id: Uuid::nil(),
            timestamp: 0,
        }
    }

    fn entry() -> CloudEntry {
        CloudEntry {
            kind: "vpc".to_string(),
            cloud_id: "cloud-1".to_string(),
            parent_cloud_id: String::new(),
            name: "vpc-a".to_string(),
            status: 2,
            version: 1,
            labels: vec![],
            attributes: HashMap::new(),
        }
    }

    #[test]
    fn vpc_create_payload_round_trips_through_prost() {
        let payload = build_create_payload(ResourceKind::Vpc, txn(), &entry()).expect("vpc has a create op");
        let decoded = CreateVpcRequest::decode(payload.as_slice()).expect("valid CreateVpcRequest");
        assert_eq!(decoded.vpc.unwrap().cloud_id, "cloud-1");
    }

    #[test]
    fn rack_and_tray_have_no_mutating_ops() {
        assert!(build_create_payload(ResourceKind::Rack, txn(), &entry()).is_none());
        assert!(build_delete_payload(ResourceKind::Tray, txn(), "cloud-1").is_none());
        let ops = reconcile_ops(ResourceKind::Rack);
        assert!(ops.create_workflow.is_none() && ops.update_workflow.is_none() && ops.delete_workflow.is_none());
    }
}
