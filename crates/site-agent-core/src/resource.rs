//! The inventory resource model: the 16 kinds the agent reconciles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::EnumIter;
use uuid::Uuid;

/// Every resource kind the Cloud inventory and the site controllers agree on.
///
/// `BTreeMap` rather than `HashMap`-keyed iteration order is why `labels` on
/// [`Resource`] is a `BTreeMap`: the reconciler's fingerprint hash (see
/// `site-agent-reconciler::fingerprint`) needs a canonical byte encoding, and
/// sorted labels get that for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter)]
pub enum ResourceKind {
    Vpc,
    Subnet,
    Instance,
    Machine,
    ExpectedMachine,
    InstanceType,
    InfiniBandPartition,
    NvLinkLogicalPartition,
    SshKeyGroup,
    OperatingSystem,
    NetworkSecurityGroup,
    DpuExtensionService,
    Tenant,
    Sku,
    Tray,
    Rack,
}

impl ResourceKind {
    /// Stable lowercase name, used for metric labels and queue routing keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Vpc => "vpc",
            ResourceKind::Subnet => "subnet",
            ResourceKind::Instance => "instance",
            ResourceKind::Machine => "machine",
            ResourceKind::ExpectedMachine => "expected_machine",
            ResourceKind::InstanceType => "instance_type",
            ResourceKind::InfiniBandPartition => "infiniband_partition",
            ResourceKind::NvLinkLogicalPartition => "nvlink_logical_partition",
            ResourceKind::SshKeyGroup => "ssh_key_group",
            ResourceKind::OperatingSystem => "operating_system",
            ResourceKind::NetworkSecurityGroup => "network_security_group",
            ResourceKind::DpuExtensionService => "dpu_extension_service",
            ResourceKind::Tenant => "tenant",
            ResourceKind::Sku => "sku",
            ResourceKind::Tray => "tray",
            ResourceKind::Rack => "rack",
        }
    }

    /// Kinds that represent physical inventory rather than a Cloud-owned
    /// logical object. These are never auto-deleted on reconcile — see
    /// `site-agent-managers::policy`.
    pub fn is_physical_inventory(&self) -> bool {
        matches!(
            self,
            ResourceKind::Machine
                | ResourceKind::ExpectedMachine
                | ResourceKind::Tray
                | ResourceKind::Rack
        )
    }
}

/// Lifecycle state of a resource as tracked by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceStatus {
    Pending,
    Ready,
    Error,
    Maintenance,
    Unknown,
    /// Present on the site controller but absent from the last Cloud page;
    /// only ever assigned to `ResourceKind::is_physical_inventory()` kinds,
    /// which are never silently deleted.
    Orphaned,
}

/// A single inventory item, as held by either the Cloud catalog or the
/// site-local controller's view of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub cloud_id: Uuid,
    pub site_id: Option<String>,
    pub status: ResourceStatus,
    pub version: u64,
    pub labels: BTreeMap<String, String>,
}

impl Resource {
    pub fn new(kind: ResourceKind, cloud_id: Uuid) -> Self {
        Self {
            kind,
            cloud_id,
            site_id: None,
            status: ResourceStatus::Pending,
            version: 0,
            labels: BTreeMap::new(),
        }
    }
}
