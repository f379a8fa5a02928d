fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_prost_build::configure().compile_protos(
        &[
            "proto/common.proto",
            "proto/workflow_engine.proto",
            "proto/machine_controller.proto",
            "proto/rack_controller.proto",
            "proto/bootstrap.proto",
            "proto/cloud_catalog.proto",
        ],
        &["proto"],
    )?;
    Ok(())
}
