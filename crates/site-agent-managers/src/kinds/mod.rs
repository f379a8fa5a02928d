//! One module per resource kind. `vpc`/`subnet`/`instance`
//! get first-class typed messages; `generic` covers the catalog/tenancy/
//! fabric kinds that share `GenericResource`; `machine`/`expected_machine`
//! speak the machine controller's discovery surface; `tray`/`rack` speak
//! the rack controller.

mod expected_machine;
mod generic;
mod instance;
mod machine;
mod rack;
mod subnet;
mod tray;
mod vpc;

pub use expected_machine::ExpectedMachineManager;
pub use generic::{
    DpuExtensionServiceManager, InfiniBandPartitionManager, InstanceTypeManager, NetworkSecurityGroupManager,
    NvLinkLogicalPartitionManager, OperatingSystemManager, SkuManager, SshKeyGroupManager, TenantManager,
};
pub use instance::InstanceManager;
pub use machine::MachineManager;
pub use rack::RackManager;
pub use subnet::SubnetManager;
pub use tray::{TrayManager, TrayPage};
pub use vpc::VpcManager;
