//! Generated gRPC stubs. Nothing hand-written lives here beyond the
//! `include_proto!` wiring — see `proto/*.proto` for the wire contracts and
//! `build.rs` for the `tonic-prost-build` invocation.

pub mod common {
    tonic::include_proto!("site_agent.common.v1");
}

pub mod workflow {
    tonic::include_proto!("site_agent.workflow.v1");
}

pub mod machine {
    tonic::include_proto!("site_agent.machine.v1");
}

pub mod rack {
    tonic::include_proto!("site_agent.rack.v1");
}

pub mod bootstrap {
    tonic::include_proto!("site_agent.bootstrap.v1");
}

pub mod cloud {
    tonic::include_proto!("site_agent.cloud.v1");
}
