//! Layered configuration for the site agent.
//!
//! Load order, lowest to highest precedence: built-in [`SiteAgentConfig::default`],
//! an optional `/etc/site-agent/config.toml` (or `SITE_AGENT_CONFIG_DIR`
//! equivalent), `SITE_AGENT_*` environment variables, then CLI flags.
//! Each layer overrides only the fields it sets, via the `config` crate's
//! `Environment`/`File` sources rather than a single TOML round trip.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Per-kind cron interval override; the bulk of kinds use
/// [`ReconcileConfig::default_interval_secs`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindIntervalOverride {
    pub kind: String,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub cloud_page_size: u32,
    pub site_page_size: u32,
    pub apply_concurrency: usize,
    pub default_interval_secs: u64,
    pub overrides: Vec<KindIntervalOverride>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            cloud_page_size: 100,
            site_page_size: 100,
            apply_concurrency: 8,
            default_interval_secs: 60,
            overrides: Vec::new(),
        }
    }
}

impl ReconcileConfig {
    pub fn interval_for(&self, kind: &str) -> Duration {
        let secs = self
            .overrides
            .iter()
            .find(|o| o.kind == kind)
            .map(|o| o.interval_secs)
            .unwrap_or(self.default_interval_secs);
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub initial_interval_ms: u64,
    pub backoff_coefficient: f64,
    pub max_interval_ms: u64,
    pub max_attempts_interactive: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 1_000,
            backoff_coefficient: 2.0,
            max_interval_ms: 10_000,
            max_attempts_interactive: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteAgentConfig {
    pub site_id: String,
    pub machine_controller_addr: String,
    pub rack_controller_addr: String,
    pub workflow_engine_addr: String,
    pub bootstrap_endpoint: String,
    pub cloud_catalog_addr: String,
    pub config_dir: PathBuf,
    pub publish_queue: String,
    pub subscribe_queue: String,
    pub inventory_activity_timeout_minutes: u64,
    pub health_bind_address: String,
    pub log_format: LogFormat,
    pub reconcile: ReconcileConfig,
    pub retry: RetryConfig,
    /// Master-pod gating: only the elected master registers the OTP-receive
    /// workflow. Resolved by an external leader-election component in a
    /// real deployment; surfaced here as a plain flag.
    pub is_master: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for SiteAgentConfig {
    fn default() -> Self {
        Self {
            site_id: String::new(),
            machine_controller_addr: "http://127.0.0.1:9001".to_string(),
            rack_controller_addr: "http://127.0.0.1:9002".to_string(),
            workflow_engine_addr: "http://127.0.0.1:9003".to_string(),
            bootstrap_endpoint: "http://127.0.0.1:9004".to_string(),
            cloud_catalog_addr: "http://127.0.0.1:9005".to_string(),
            config_dir: PathBuf::from("/etc/site-agent"),
            publish_queue: "site-publish".to_string(),
            subscribe_queue: "site-subscribe".to_string(),
            inventory_activity_timeout_minutes: 5,
            health_bind_address: "0.0.0.0:8080".to_string(),
            log_format: LogFormat::Pretty,
            reconcile: ReconcileConfig::default(),
            retry: RetryConfig::default(),
            is_master: true,
        }
    }
}

impl SiteAgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_id.trim().is_empty() {
            return Err(ConfigError::Invalid("SITE_ID must not be empty".into()));
        }
        if self.inventory_activity_timeout_minutes < 1 {
            return Err(ConfigError::Invalid(
                "INVENTORY_ACTIVITY_TIMEOUT_MINUTES must be >= 1".into(),
            ));
        }
        Ok(())
    }

    pub fn inventory_activity_timeout(&self) -> Duration {
        Duration::from_secs(self.inventory_activity_timeout_minutes * 60)
    }

    pub fn certs_dir(&self) -> PathBuf {
        self.config_dir.join("certs")
    }

    /// Builds the layered config: defaults -> optional file -> `SITE_AGENT_*`
    /// env vars -> CLI overrides.
    pub fn load(cli: CliArgs) -> Result<Self, ConfigError> {
        let defaults = SiteAgentConfig::default();
        let mut builder = config::Config::builder()
            .set_default("site_id", defaults.site_id.clone())
            .map_err(ConfigError::Load)?
            .set_default("machine_controller_addr", defaults.machine_controller_addr.clone())
            .map_err(ConfigError::Load)?
            .set_default("rack_controller_addr", defaults.rack_controller_addr.clone())
            .map_err(ConfigError::Load)?
            .set_default("workflow_engine_addr", defaults.workflow_engine_addr.clone())
            .map_err(ConfigError::Load)?
            .set_default("bootstrap_endpoint", defaults.bootstrap_endpoint.clone())
            .map_err(ConfigError::Load)?
            .set_default("cloud_catalog_addr", defaults.cloud_catalog_addr.clone())
            .map_err(ConfigError::Load)?
            .set_default("config_dir", defaults.config_dir.to_string_lossy().to_string())
            .map_err(ConfigError::Load)?
            .set_default("publish_queue", defaults.publish_queue.clone())
            .map_err(ConfigError::Load)?
            .set_default("subscribe_queue", defaults.subscribe_queue.clone())
            .map_err(ConfigError::Load)?
            .set_default(
                "inventory_activity_timeout_minutes",
                defaults.inventory_activity_timeout_minutes as i64,
            )
            .map_err(ConfigError::Load)?
            .set_default("health_bind_address", defaults.health_bind_address.clone())
            .map_err(ConfigError::Load)?
            .set_default("log_format", "pretty")
            .map_err(ConfigError::Load)?;

        if let Ok(dir) = std::env::var("SITE_AGENT_CONFIG_DIR") {
            let candidate = PathBuf::from(&dir).join("config.toml");
            if candidate.exists() {
                builder = builder.add_source(
                    config::File::from(candidate).format(config::FileFormat::Toml),
                );
            }
        } else {
            let default_path = PathBuf::from("/etc/site-agent/config.toml");
            if default_path.exists() {
                builder = builder.add_source(
                    config::File::from(default_path).format(config::FileFormat::Toml),
                );
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SITE_AGENT")
                .separator("__")
                .try_parsing(true),
        );

        let raw = builder.build().map_err(ConfigError::Load)?;

        let mut cfg = SiteAgentConfig {
            site_id: raw.get_string("site_id").unwrap_or_default(),
            machine_controller_addr: raw
                .get_string("machine_controller_addr")
                .unwrap_or(defaults.machine_controller_addr),
            rack_controller_addr: raw
                .get_string("rack_controller_addr")
                .unwrap_or(defaults.rack_controller_addr),
            workflow_engine_addr: raw
                .get_string("workflow_engine_addr")
                .unwrap_or(defaults.workflow_engine_addr),
            bootstrap_endpoint: raw
                .get_string("bootstrap_endpoint")
                .unwrap_or(defaults.bootstrap_endpoint),
            cloud_catalog_addr: raw
                .get_string("cloud_catalog_addr")
                .unwrap_or(defaults.cloud_catalog_addr),
            config_dir: PathBuf::from(
                raw.get_string("config_dir")
                    .unwrap_or_else(|_| defaults.config_dir.to_string_lossy().to_string()),
            ),
            publish_queue: raw.get_string("publish_queue").unwrap_or(defaults.publish_queue),
            subscribe_queue: raw
                .get_string("subscribe_queue")
                .unwrap_or(defaults.subscribe_queue),
            inventory_activity_timeout_minutes: raw
                .get_int("inventory_activity_timeout_minutes")
                .map(|v| v as u64)
                .unwrap_or(defaults.inventory_activity_timeout_minutes),
            health_bind_address: raw
                .get_string("health_bind_address")
                .unwrap_or(defaults.health_bind_address),
            log_format: if raw.get_string("log_format").as_deref() == Ok("json") {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            reconcile: ReconcileConfig::default(),
            retry: RetryConfig::default(),
            is_master: defaults.is_master,
        };

        // CLI flags take final precedence over file/env.
        if let Some(site_id) = cli.site_id {
            cfg.site_id = site_id;
        }
        if let Some(addr) = cli.machine_controller_addr {
            cfg.machine_controller_addr = addr;
        }
        if let Some(addr) = cli.rack_controller_addr {
            cfg.rack_controller_addr = addr;
        }
        if let Some(addr) = cli.workflow_engine_addr {
            cfg.workflow_engine_addr = addr;
        }
        if let Some(addr) = cli.bootstrap_endpoint {
            cfg.bootstrap_endpoint = addr;
        }
        if let Some(addr) = cli.cloud_catalog_addr {
            cfg.cloud_catalog_addr = addr;
        }
        if let Some(dir) = cli.config_dir {
            cfg.config_dir = dir;
        }
        if let Some(addr) = cli.health_bind_address {
            cfg.health_bind_address = addr;
        }
        if cli.log_format_json {
            cfg.log_format = LogFormat::Json;
        }
        if let Some(minutes) = cli.inventory_activity_timeout_minutes {
            cfg.inventory_activity_timeout_minutes = minutes;
        }
        cfg.is_master = cli.is_master;

        cfg.validate()?;
        Ok(cfg)
    }
}

/// CLI overrides layered on top of file/env configuration.
#[derive(Debug, Parser, Default)]
#[command(name = "site-agent", about = "Per-site bare-metal fleet orchestration daemon")]
pub struct CliArgs {
    #[arg(long, env = "SITE_ID")]
    pub site_id: Option<String>,

    #[arg(long, env = "MACHINE_CONTROLLER_ADDR")]
    pub machine_controller_addr: Option<String>,

    #[arg(long, env = "RACK_CONTROLLER_ADDR")]
    pub rack_controller_addr: Option<String>,

    #[arg(long, env = "WORKFLOW_ENGINE_ADDR")]
    pub workflow_engine_addr: Option<String>,

    #[arg(long, env = "BOOTSTRAP_ENDPOINT")]
    pub bootstrap_endpoint: Option<String>,

    #[arg(long, env = "CLOUD_CATALOG_ADDR")]
    pub cloud_catalog_addr: Option<String>,

    #[arg(long, env = "SITE_AGENT_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[arg(long, env = "SITE_AGENT_HEALTH_BIND_ADDRESS")]
    pub health_bind_address: Option<String>,

    #[arg(long, env = "SITE_AGENT_LOG_FORMAT_JSON")]
    pub log_format_json: bool,

    /// One-time password for first-boot credential bootstrap. Unused on
    /// every boot after the first: once `certs/` exists, the agent reloads
    /// from disk instead.
    #[arg(long, env = "SITE_OTP")]
    pub otp: Option<String>,

    /// Resolved by an external leader-election component in a real
    /// deployment; surfaced here as a plain flag since this repo has no
    /// leader-election component of its own to resolve it.
    #[arg(long, env = "SITE_AGENT_IS_MASTER", default_value_t = true)]
    pub is_master: bool,

    /// Bare-name override for the inventory-cron activity deadline; mirrors
    /// the bare-name bindings above rather than requiring the
    /// `SITE_AGENT_` prefix the generic `Environment` source applies to
    /// every other field.
    #[arg(long, env = "INVENTORY_ACTIVITY_TIMEOUT_MINUTES")]
    pub inventory_activity_timeout_minutes: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_fails_validation_without_site_id() {
        let cfg = SiteAgentConfig::default();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn cli_inventory_timeout_overrides_the_default() {
        let cli = CliArgs {
            site_id: Some("site-1".to_string()),
            inventory_activity_timeout_minutes: Some(10),
            ..Default::default()
        };
        let cfg = SiteAgentConfig::load(cli).expect("valid config");
        assert_eq!(cfg.inventory_activity_timeout_minutes, 10);
    }

    #[test]
    fn interval_override_falls_back_to_default() {
        let mut reconcile = ReconcileConfig::default();
        reconcile.overrides.push(KindIntervalOverride {
            kind: "machine".to_string(),
            interval_secs: 30,
        });
        assert_eq!(reconcile.interval_for("machine"), Duration::from_secs(30));
        assert_eq!(reconcile.interval_for("vpc"), Duration::from_secs(60));
    }
}
