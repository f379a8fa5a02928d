//! [`GrpcService`] implementations for the two controllers this agent talks
//! to, plus the convenient `MachineClient`/`RackClient` type aliases used
//! everywhere else in the workspace.

use std::future::Future;
use std::pin::Pin;

use site_agent_proto::cloud::cloud_catalog_client::CloudCatalogClient;
use site_agent_proto::cloud::GetVersionRequest as CloudGetVersionRequest;
use site_agent_proto::machine::machine_controller_client::MachineControllerClient;
use site_agent_proto::machine::GetVersionRequest as MachineGetVersionRequest;
use site_agent_proto::rack::rack_controller_client::RackControllerClient;
use site_agent_proto::rack::GetVersionRequest as RackGetVersionRequest;
use tonic::transport::Channel;
use tonic::Status;

use crate::client::{AtomicClient, GrpcService};

pub struct MachineControllerService;

impl GrpcService for MachineControllerService {
    type Client = MachineControllerClient<Channel>;

    fn from_channel(channel: Channel) -> Self::Client {
        MachineControllerClient::new(channel)
    }

    fn probe(mut client: Self::Client) -> Pin<Box<dyn Future<Output = Result<(), Status>> + Send>> {
        Box::pin(async move {
            client.get_version(MachineGetVersionRequest {}).await?;
            Ok(())
        })
    }

    fn name() -> &'static str {
        "machine_controller"
    }
}

pub struct RackControllerService;

impl GrpcService for RackControllerService {
    type Client = RackControllerClient<Channel>;

    fn from_channel(channel: Channel) -> Self::Client {
        RackControllerClient::new(channel)
    }

    fn probe(mut client: Self::Client) -> Pin<Box<dyn Future<Output = Result<(), Status>> + Send>> {
        Box::pin(async move {
            client.get_version(RackGetVersionRequest {}).await?;
            Ok(())
        })
    }

    fn name() -> &'static str {
        "rack_controller"
    }
}

pub struct CloudCatalogService;

impl GrpcService for CloudCatalogService {
    type Client = CloudCatalogClient<Channel>;

    fn from_channel(channel: Channel) -> Self::Client {
        CloudCatalogClient::new(channel)
    }

    fn probe(mut client: Self::Client) -> Pin<Box<dyn Future<Output = Result<(), Status>> + Send>> {
        Box::pin(async move {
            client.get_version(CloudGetVersionRequest {}).await?;
            Ok(())
        })
    }

    fn name() -> &'static str {
        "cloud_catalog"
    }
}

pub type MachineClient = AtomicClient<MachineControllerService>;
pub type RackClient = AtomicClient<RackControllerService>;
pub type CloudClient = AtomicClient<CloudCatalogService>;
