//! Inventory reconciliation: pages the Cloud catalog and each site
//! controller, diffs by fingerprint, and applies the drift through the
//! workflow engine on a per-kind cron.
//!
//! Depends on `site-agent-workflow` for the `Orchestrator` it applies drift
//! through, never the other way around.

pub mod cloud;
pub mod cron;
pub mod engine;
pub mod fingerprint;
pub mod ops;
pub mod site;

pub use cloud::{CloudEntry, CloudPage, CloudPager};
pub use cron::CronScheduler;
pub use engine::{ReconcileEngine, TickSummary};
pub use ops::{reconcile_ops, ReconcileOps};
pub use site::{SiteEntry, SitePage, SitePager};
