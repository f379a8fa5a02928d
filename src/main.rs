//! Binary entry point: parse CLI flags, load the layered config, set up
//! tracing, and hand off to [`site_agent::run`]. The environment variables
//! (`SITE_ID`, `INVENTORY_ACTIVITY_TIMEOUT_MINUTES`, controller addresses)
//! are all resolved inside `SiteAgentConfig::load`.

use clap::Parser;
use site_agent_config::{CliArgs, LogFormat, SiteAgentConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();
    let otp = cli.otp.clone();
    let config = SiteAgentConfig::load(cli)?;

    init_tracing(config.log_format);

    tracing::info!(
        site_id = %config.site_id,
        machine_controller = %config.machine_controller_addr,
        rack_controller = %config.rack_controller_addr,
        workflow_engine = %config.workflow_engine_addr,
        "starting site-agent"
    );

    site_agent::run(config, otp).await
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}
