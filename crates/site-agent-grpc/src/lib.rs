//! The atomic gRPC client wrapping the machine and rack controllers.

pub mod client;
pub mod services;

pub use client::{AtomicClient, GrpcService, ReinitializableClient};
pub use services::{
    CloudCatalogService, CloudClient, MachineClient, MachineControllerService, RackClient, RackControllerService,
};
