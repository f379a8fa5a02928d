//! Paging the site controllers and normalizing every kind's wire shape
//! down to one [`SiteEntry`] — the same "make every kind look the same to
//! the reconciler" move `cloud_catalog.proto`'s `CloudResource` already
//! makes on the Cloud side.

use std::collections::BTreeMap;
use std::sync::Arc;

use site_agent_core::{ResourceKind, SiteAgentResult};
use site_agent_managers::{
    DpuExtensionServiceManager, ExpectedMachineManager, InfiniBandPartitionManager, InstanceManager,
    InstanceTypeManager, MachineManager, NetworkSecurityGroupManager, NvLinkLogicalPartitionManager,
    OperatingSystemManager, RackManager, SkuManager, SshKeyGroupManager, SubnetManager, TenantManager, TrayManager,
    VpcManager,
};
use site_agent_proto::common::Label;
use site_agent_proto::machine::GenericResource;
use site_agent_proto::rack::{Rack, Tray};

#[derive(Debug, Clone)]
pub struct SiteEntry {
    pub cloud_id: String,
    pub site_id: String,
    pub parent_cloud_id: String,
    pub name: String,
    pub status: i32,
    pub version: u64,
    pub labels: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, String>,
}

pub struct SitePage {
    pub entries: Vec<SiteEntry>,
    pub next_page_token: String,
}

fn labels_map(labels: &[Label]) -> BTreeMap<String, String> {
    labels.iter().map(|l| (l.key.clone(), l.value.clone())).collect()
}

fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn from_generic(resources: Vec<GenericResource>) -> Vec<SiteEntry> {
    resources
        .into_iter()
        .map(|r| SiteEntry {
            cloud_id: r.cloud_id,
            site_id: r.site_id,
            parent_cloud_id: r.parent_cloud_id,
            name: r.name,
            status: r.status,
            version: r.version,
            labels: labels_map(&r.labels),
            attributes: r.attributes.into_iter().collect(),
        })
        .collect()
}

fn from_racks(racks: Vec<Rack>) -> Vec<SiteEntry> {
    racks
        .into_iter()
        .map(|r| SiteEntry {
            cloud_id: r.cloud_id,
            site_id: r.site_id,
            parent_cloud_id: String::new(),
            name: r.name,
            status: r.status,
            version: r.version,
            labels: labels_map(&r.labels),
            attributes: attrs(&[("tray_site_ids", &r.tray_site_ids.join(","))]),
        })
        .collect()
}

fn from_trays(trays: Vec<Tray>) -> Vec<SiteEntry> {
    trays
        .into_iter()
        .map(|t| SiteEntry {
            cloud_id: t.cloud_id,
            site_id: t.site_id,
            parent_cloud_id: String::new(),
            name: t.slot.clone(),
            status: t.status,
            version: t.version,
            labels: labels_map(&t.labels),
            attributes: attrs(&[("rack_site_id", &t.rack_site_id), ("slot", &t.slot)]),
        })
        .collect()
}

/// One pager per registered kind, holding the same manager instance wired
/// into the [`site_agent_managers::ManagerRegistry`] so there is exactly
/// one client connection per resource kind.
pub enum SitePager {
    Vpc(Arc<VpcManager>),
    Subnet(Arc<SubnetManager>),
    Instance(Arc<InstanceManager>),
    Machine(Arc<MachineManager>),
    ExpectedMachine(Arc<ExpectedMachineManager>),
    InstanceType(Arc<InstanceTypeManager>),
    InfiniBandPartition(Arc<InfiniBandPartitionManager>),
    NvLinkLogicalPartition(Arc<NvLinkLogicalPartitionManager>),
    SshKeyGroup(Arc<SshKeyGroupManager>),
    OperatingSystem(Arc<OperatingSystemManager>),
    NetworkSecurityGroup(Arc<NetworkSecurityGroupManager>),
    DpuExtensionService(Arc<DpuExtensionServiceManager>),
    Tenant(Arc<TenantManager>),
    Sku(Arc<SkuManager>),
    Tray(Arc<TrayManager>),
    Rack(Arc<RackManager>),
}

impl SitePager {
    pub fn kind(&self) -> ResourceKind {
        match self {
            SitePager::Vpc(_) => ResourceKind::Vpc,
            SitePager::Subnet(_) => ResourceKind::Subnet,
            SitePager::Instance(_) => ResourceKind::Instance,
            SitePager::Machine(_) => ResourceKind::Machine,
            SitePager::ExpectedMachine(_) => ResourceKind::ExpectedMachine,
            SitePager::InstanceType(_) => ResourceKind::InstanceType,
            SitePager::InfiniBandPartition(_) => ResourceKind::InfiniBandPartition,
            SitePager::NvLinkLogicalPartition(_) => ResourceKind::NvLinkLogicalPartition,
            SitePager::SshKeyGroup(_) => ResourceKind::SshKeyGroup,
            SitePager::OperatingSystem(_) => ResourceKind::OperatingSystem,
            SitePager::NetworkSecurityGroup(_) => ResourceKind::NetworkSecurityGroup,
            SitePager::DpuExtensionService(_) => ResourceKind::DpuExtensionService,
            SitePager::Tenant(_) => ResourceKind::Tenant,
            SitePager::Sku(_) => ResourceKind::Sku,
            SitePager::Tray(_) => ResourceKind::Tray,
            SitePager::Rack(_) => ResourceKind::Rack,
        }
    }

    pub async fn list(&self, page_token: String, page_size: i32) -> SiteAgentResult<SitePage> {
        match self {
            SitePager::Vpc(m) => {
                let r = m.list_site(page_token, page_size).await?;
                let entries = r
                    .vpcs
                    .into_iter()
                    .map(|v| SiteEntry {
                        cloud_id: v.cloud_id,
                        site_id: v.site_id,
                        parent_cloud_id: String::new(),
                        name: v.name,
                        status: v.status,
                        version: v.version,
                        labels: labels_map(&v.labels),
                        attributes: attrs(&[("cidr_block", &v.cidr_block)]),
                    })
                    .collect();
                Ok(SitePage { entries, next_page_token: r.next_page_token })
            }
            SitePager::Subnet(m) => {
                let r = m.list_site(page_token, page_size).await?;
                let entries = r
                    .subnets
                    .into_iter()
                    .map(|s| SiteEntry {
                        cloud_id: s.cloud_id,
                        site_id: s.site_id,
                        parent_cloud_id: s.vpc_cloud_id,
                        name: s.name,
                        status: s.status,
                        version: s.version,
                        labels: labels_map(&s.labels),
                        attributes: attrs(&[("cidr_block", &s.cidr_block)]),
                    })
                    .collect();
                Ok(SitePage { entries, next_page_token: r.next_page_token })
            }
            SitePager::Instance(m) => {
                let r = m.list_site(page_token, page_size).await?;
                let entries = r
                    .instances
                    .into_iter()
                    .map(|i| SiteEntry {
                        cloud_id: i.cloud_id,
                        site_id: i.site_id,
                        parent_cloud_id: i.subnet_cloud_id,
                        name: i.name,
                        status: i.status,
                        version: i.version,
                        labels: labels_map(&i.labels),
                        attributes: attrs(&[
                            ("instance_type_cloud_id", &i.instance_type_cloud_id),
                            ("operating_system_cloud_id", &i.operating_system_cloud_id),
                        ]),
                    })
                    .collect();
                Ok(SitePage { entries, next_page_token: r.next_page_token })
            }
            SitePager::Machine(m) => {
                let r = m.list_site(page_token, page_size).await?;
                Ok(SitePage { entries: from_generic(r.resources), next_page_token: r.next_page_token })
            }
            SitePager::ExpectedMachine(m) => {
                let r = m.list_site(page_token, page_size).await?;
                Ok(SitePage { entries: from_generic(r.resources), next_page_token: r.next_page_token })
            }
            SitePager::InstanceType(m) => {
                let r = m.list_site(page_token, page_size).await?;
                Ok(SitePage { entries: from_generic(r.resources), next_page_token: r.next_page_token })
            }
            SitePager::InfiniBandPartition(m) => {
                let r = m.list_site(page_token, page_size).await?;
                Ok(SitePage { entries: from_generic(r.resources), next_page_token: r.next_page_token })
            }
            SitePager::NvLinkLogicalPartition(m) => {
                let r = m.list_site(page_token, page_size).await?;
                Ok(SitePage { entries: from_generic(r.resources), next_page_token: r.next_page_token })
            }
            SitePager::SshKeyGroup(m) => {
                let r = m.list_site(page_token, page_size).await?;
                Ok(SitePage { entries: from_generic(r.resources), next_page_token: r.next_page_token })
            }
            SitePager::OperatingSystem(m) => {
                let r = m.list_site(page_token, page_size).await?;
                Ok(SitePage { entries: from_generic(r.resources), next_page_token: r.next_page_token })
            }
            SitePager::NetworkSecurityGroup(m) => {
                let r = m.list_site(page_token, page_size).await?;
                Ok(SitePage { entries: from_generic(r.resources), next_page_token: r.next_page_token })
            }
            SitePager::DpuExtensionService(m) => {
                let r = m.list_site(page_token, page_size).await?;
                Ok(SitePage { entries: from_generic(r.resources), next_page_token: r.next_page_token })
            }
            SitePager::Tenant(m) => {
                let r = m.list_site(page_token, page_size).await?;
                Ok(SitePage { entries: from_generic(r.resources), next_page_token: r.next_page_token })
            }
            SitePager::Sku(m) => {
                let r = m.list_site(page_token, page_size).await?;
                Ok(SitePage { entries: from_generic(r.resources), next_page_token: r.next_page_token })
            }
            SitePager::Tray(m) => {
                let r = m.list_site(page_token, page_size).await?;
                Ok(SitePage { entries: from_trays(r.trays), next_page_token: r.next_page_token })
            }
            SitePager::Rack(m) => {
                let r = m.list_site(page_token, page_size).await?;
                Ok(SitePage { entries: from_racks(r.racks), next_page_token: r.next_page_token })
            }
        }
    }
}
