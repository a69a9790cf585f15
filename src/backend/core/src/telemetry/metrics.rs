//! Prometheus metrics for enforcement decisions and policy persistence.
//!
//! Counters are recorded through the `metrics` facade and are free when no
//! recorder is installed. [`init_metrics`] installs a Prometheus recorder whose
//! handle renders the text exposition format.
//!
//! # Example
//!
//! ```rust,no_run
//! use gatekeeper_core::telemetry::metrics::{init_metrics, MetricsConfig, PolicyMetrics};
//!
//! let registry = init_metrics(&MetricsConfig { enabled: true, ..Default::default() }).unwrap();
//! PolicyMetrics::record_decision(true);
//! println!("{}", registry.render());
//! ```

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;
use std::collections::HashMap;

/// Metrics configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder
    #[serde(default)]
    pub enabled: bool,

    /// Global labels added to every metric
    #[serde(default)]
    pub global_labels: HashMap<String, String>,
}

/// Holds the Prometheus handle when metrics are enabled.
pub struct MetricsRegistry {
    prometheus_handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("prometheus_handle", &self.prometheus_handle.is_some())
            .finish()
    }
}

impl MetricsRegistry {
    /// A registry with no recorder behind it.
    pub fn disabled() -> Self {
        Self {
            prometheus_handle: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.prometheus_handle.is_some()
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.prometheus_handle
            .as_ref()
            .map(|h| h.render())
            .unwrap_or_default()
    }
}

/// Initialize the metrics subsystem.
///
/// # Errors
///
/// Returns an error if a global recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> anyhow::Result<MetricsRegistry> {
    if !config.enabled {
        return Ok(MetricsRegistry::disabled());
    }

    let mut builder = PrometheusBuilder::new();
    for (key, value) in &config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    let handle = builder.install_recorder()?;
    register_metric_descriptions();

    tracing::info!("Metrics initialized");

    Ok(MetricsRegistry {
        prometheus_handle: Some(handle),
    })
}

fn register_metric_descriptions() {
    describe_counter!(
        "gatekeeper_enforce_total",
        "Enforcement decisions by outcome"
    );
    describe_counter!(
        "gatekeeper_policy_loads_total",
        "Policy loads from the backing store or a policy source"
    );
    describe_counter!(
        "gatekeeper_policy_saves_total",
        "Policy snapshot saves by outcome"
    );
    describe_counter!(
        "gatekeeper_source_lines_skipped_total",
        "Policy source records skipped during bulk load"
    );
    describe_counter!("gatekeeper_errors_total", "Errors by category and code");
    describe_gauge!("gatekeeper_policy_rules", "Policy rules held in memory");
    describe_gauge!(
        "gatekeeper_role_assignments",
        "Role assignments held in memory"
    );
}

/// Recording helpers for policy engine events.
pub struct PolicyMetrics;

impl PolicyMetrics {
    pub fn record_decision(allowed: bool) {
        let decision = if allowed { "allow" } else { "deny" };
        counter!("gatekeeper_enforce_total", "decision" => decision).increment(1);
    }

    /// Record a completed load. `origin` is `store` or `source`.
    pub fn record_load(origin: &'static str) {
        counter!("gatekeeper_policy_loads_total", "origin" => origin).increment(1);
    }

    pub fn record_save(ok: bool) {
        let outcome = if ok { "ok" } else { "failed" };
        counter!("gatekeeper_policy_saves_total", "outcome" => outcome).increment(1);
    }

    pub fn record_skipped_line(reason: &'static str) {
        counter!("gatekeeper_source_lines_skipped_total", "reason" => reason).increment(1);
    }

    /// Publish the current store size.
    pub fn set_store_size(policies: usize, assignments: usize) {
        gauge!("gatekeeper_policy_rules").set(policies as f64);
        gauge!("gatekeeper_role_assignments").set(assignments as f64);
    }
}
