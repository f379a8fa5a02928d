//! Per-kind resource managers, the [`ManagerRegistry`] that dispatches to
//! them, and the per-kind reconciliation-safety [`policy`] table.
//!
//! This crate deliberately does not depend on `site-agent-workflow`: the
//! activity-level bookkeeping (`started`/`activity_succeeded`/
//! `activity_failed` counters) lives here via [`activity::run_activity`],
//! while the workflow-level concerns (per-resource ordering, retry policy,
//! publish/subscribe queue wiring) live one layer up and depend on this
//! crate, not the other way around.

pub mod activity;
pub mod kinds;
pub mod manager;
pub mod policy;
pub mod registry;

pub use kinds::{
    DpuExtensionServiceManager, ExpectedMachineManager, InfiniBandPartitionManager, InstanceManager,
    InstanceTypeManager, MachineManager, NetworkSecurityGroupManager, NvLinkLogicalPartitionManager,
    OperatingSystemManager, RackManager, SkuManager, SshKeyGroupManager, SubnetManager, TenantManager, TrayManager,
    TrayPage, VpcManager,
};
pub use manager::{ActivityContext, CronRegistration, PublisherRegistration, ResourceManager, SubscriberRegistration};
pub use policy::{kind_policy, AlreadyExistsPolicy, DeletePolicy, KindPolicy};
pub use registry::{ManagerRegistry, ManagerRegistryBuilder};
