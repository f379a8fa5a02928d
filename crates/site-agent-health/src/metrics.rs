//! Per-kind counter export: `"{kind}_workflow_started N"` and its four
//! siblings, plus the same data as Prometheus gauges for the `/metrics`
//! text endpoint.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use prometheus::{HistogramOpts, HistogramVec, IntGaugeVec, Opts, Registry, TextEncoder};
use site_agent_core::{ActivityCounters, ResourceKind};

/// Holds one [`ActivityCounters`] per registered kind and renders both a
/// plaintext line format and a Prometheus registry from the same
/// underlying atomics. Built once at startup as managers are registered;
/// never removed from afterward (kinds don't disappear at runtime).
pub struct MetricsRegistry {
    counters: RwLock<HashMap<ResourceKind, Arc<ActivityCounters>>>,
    registry: Registry,
    started: IntGaugeVec,
    activity_failed: IntGaugeVec,
    activity_succeeded: IntGaugeVec,
    publish_failed: IntGaugeVec,
    publish_succeeded: IntGaugeVec,
    workflow_latency: HistogramVec,
}

impl MetricsRegistry {
    pub fn new() -> Arc<Self> {
        let registry = Registry::new();

        let make = |name: &str, help: &str| {
            let gauge = IntGaugeVec::new(Opts::new(name, help), &["kind"])
                .expect("static metric name/labels are always valid");
            registry
                .register(Box::new(gauge.clone()))
                .expect("metric names are unique within this registry");
            gauge
        };

        let workflow_latency = HistogramVec::new(
            HistogramOpts::new(
                "site_agent_workflow_latency_seconds",
                "do_workflow end-to-end latency (activity + publish), per kind and workflow name",
            ),
            &["kind", "workflow"],
        )
        .expect("static metric name/labels are always valid");
        registry
            .register(Box::new(workflow_latency.clone()))
            .expect("metric names are unique within this registry");

        Arc::new(Self {
            counters: RwLock::new(HashMap::new()),
            started: make("site_agent_workflow_started", "Activities started, per resource kind"),
            activity_failed: make(
                "site_agent_workflow_activity_failed",
                "Activities that failed, per resource kind",
            ),
            activity_succeeded: make(
                "site_agent_workflow_activity_succeeded",
                "Activities that succeeded, per resource kind",
            ),
            publish_failed: make(
                "site_agent_workflow_publish_failed",
                "Publishes to Cloud that failed, per resource kind",
            ),
            publish_succeeded: make(
                "site_agent_workflow_publish_succeeded",
                "Publishes to Cloud that succeeded, per resource kind",
            ),
            workflow_latency,
            registry,
        })
    }

    /// Records one `do_workflow` invocation's end-to-end latency, as a
    /// `Histogram` per kind and workflow name.
    pub fn observe_workflow_latency(&self, kind: ResourceKind, workflow_name: &str, seconds: f64) {
        self.workflow_latency.with_label_values(&[kind.as_str(), workflow_name]).observe(seconds);
    }

    /// Called once per kind when its `ResourceManager` registers with the
    /// `ManagerRegistry`.
    pub fn register_kind(&self, kind: ResourceKind, counters: Arc<ActivityCounters>) {
        self.counters
            .write()
            .expect("counters lock poisoned")
            .insert(kind, counters);
    }

    /// Refreshes the Prometheus gauges from the live atomics and encodes the
    /// registry to text format for the `/metrics` handler.
    pub fn render(&self) -> String {
        let snapshot = {
            let counters = self.counters.read().expect("counters lock poisoned");
            counters
                .iter()
                .map(|(kind, c)| (*kind, c.snapshot()))
                .collect::<Vec<_>>()
        };

        for (kind, snap) in &snapshot {
            let label = [kind.as_str()];
            self.started.with_label_values(&label).set(snap.started as i64);
            self.activity_failed
                .with_label_values(&label)
                .set(snap.activity_failed as i64);
            self.activity_succeeded
                .with_label_values(&label)
                .set(snap.activity_succeeded as i64);
            self.publish_failed
                .with_label_values(&label)
                .set(snap.publish_failed as i64);
            self.publish_succeeded
                .with_label_values(&label)
                .set(snap.publish_succeeded as i64);
        }

        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_else(|e| format!("# encode error: {e}\n"))
    }

    /// The `"{kind}_workflow_started N"`-shaped plaintext lines, for
    /// callers that want the raw counter format rather than full
    /// Prometheus exposition.
    pub fn render_plaintext_lines(&self) -> Vec<String> {
        let counters = self.counters.read().expect("counters lock poisoned");
        let mut lines = Vec::with_capacity(counters.len() * 5);
        for (kind, c) in counters.iter() {
            let snap = c.snapshot();
            let k = kind.as_str();
            lines.push(format!("{k}_workflow_started {}", snap.started));
            lines.push(format!("{k}_workflow_activity_failed {}", snap.activity_failed));
            lines.push(format!("{k}_workflow_activity_succeeded {}", snap.activity_succeeded));
            lines.push(format!("{k}_workflow_publish_failed {}", snap.publish_failed));
            lines.push(format!("{k}_workflow_publish_succeeded {}", snap.publish_succeeded));
        }
        lines.sort();
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_registered_kind_counters() {
        let registry = MetricsRegistry::new();
        let counters = Arc::new(ActivityCounters::new());
        counters.record_started();
        counters.record_activity_result(true);
        registry.register_kind(ResourceKind::Vpc, counters);

        let lines = registry.render_plaintext_lines();
        assert!(lines.contains(&"vpc_workflow_started 1".to_string()));
        assert!(lines.contains(&"vpc_workflow_activity_succeeded 1".to_string()));
        assert!(lines.contains(&"vpc_workflow_activity_failed 0".to_string()));
    }

    #[test]
    fn prometheus_text_contains_the_metric_family_name() {
        let registry = MetricsRegistry::new();
        registry.register_kind(ResourceKind::Machine, Arc::new(ActivityCounters::new()));
        let text = registry.render();
        assert!(text.contains("site_agent_workflow_started"));
    }

    #[test]
    fn workflow_latency_observation_appears_in_rendered_text() {
        let registry = MetricsRegistry::new();
        registry.observe_workflow_latency(ResourceKind::Vpc, "CreateVPC", 0.25);
        let text = registry.render();
        assert!(text.contains("site_agent_workflow_latency_seconds"));
    }
}
