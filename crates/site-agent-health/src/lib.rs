//! The health cache component and its HTTP surface.
//!
//! `HealthCache` is the only piece of truly global mutable state here,
//! alongside the atomic client cells in `site-agent-grpc` and the
//! credential file in `site-agent-bootstrap`.

pub mod cache;
pub mod metrics;
pub mod router;

pub use cache::HealthCache;
pub use metrics::MetricsRegistry;
pub use router::router;
