//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, register_histogram_with_registry,
    register_int_gauge_with_registry, Counter, CounterVec, Histogram, HistogramVec, IntGauge,
    Opts, Registry,
};
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> =
    Lazy::new(|| Arc::new(Metrics::new().expect("Failed to initialize metrics")));

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Pipeline metrics
    pub requests: CounterVec,
    pub stage_duration: HistogramVec,
    pub fallbacks: Counter,

    // Selection metrics
    pub instruction_cost: Histogram,
    pub truncated_sets: Counter,
    pub degraded_sets: Counter,

    // Catalog metrics
    pub catalog_reloads: Counter,
    pub catalog_entries: IntGauge,
    pub catalog_excluded: IntGauge,

    // Learning metrics
    pub learning_outcomes: CounterVec,
    pub learning_dropped: Counter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = register_counter_vec_with_registry!(
            Opts::new("orchestrator_requests_total", "Processed requests by gate outcome"),
            &["outcome"],
            registry
        )?;

        let stage_duration = register_histogram_vec_with_registry!(
            "orchestrator_stage_duration_seconds",
            "Pipeline stage duration in seconds",
            &["stage"],
            registry
        )?;

        let fallbacks = register_counter_with_registry!(
            Opts::new("orchestrator_fallbacks_total", "Requests answered with the fallback context"),
            registry
        )?;

        let instruction_cost = register_histogram_with_registry!(
            "orchestrator_instruction_cost",
            "Total size cost of selected instruction sets",
            registry
        )?;

        let truncated_sets = register_counter_with_registry!(
            Opts::new("orchestrator_truncated_sets_total", "Instruction sets with skipped candidates"),
            registry
        )?;

        let degraded_sets = register_counter_with_registry!(
            Opts::new("orchestrator_degraded_sets_total", "Instruction sets where core exceeded the budget"),
            registry
        )?;

        let catalog_reloads = register_counter_with_registry!(
            Opts::new("orchestrator_catalog_reloads_total", "Catalog swaps"),
            registry
        )?;

        let catalog_entries = register_int_gauge_with_registry!(
            Opts::new("orchestrator_catalog_entries", "Entries in the active catalog"),
            registry
        )?;

        let catalog_excluded = register_int_gauge_with_registry!(
            Opts::new("orchestrator_catalog_excluded", "Entries excluded from the active catalog"),
            registry
        )?;

        let learning_outcomes = register_counter_vec_with_registry!(
            Opts::new("orchestrator_learning_outcomes_total", "Recorded outcomes by result"),
            &["result"],
            registry
        )?;

        let learning_dropped = register_counter_with_registry!(
            Opts::new("orchestrator_learning_dropped_total", "Outcome updates dropped under contention"),
            registry
        )?;

        Ok(Self {
            registry,
            requests,
            stage_duration,
            fallbacks,
            instruction_cost,
            truncated_sets,
            degraded_sets,
            catalog_reloads,
            catalog_entries,
            catalog_excluded,
            learning_outcomes,
            learning_dropped,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a processed request
    pub fn record_request(&self, outcome: &str, fallback: bool) {
        self.requests.with_label_values(&[outcome]).inc();
        if fallback {
            self.fallbacks.inc();
        }
    }

    /// Record the shape of a selected instruction set
    pub fn record_selection(&self, total_cost: u64, truncated: bool, degraded: bool) {
        self.instruction_cost.observe(total_cost as f64);
        if truncated {
            self.truncated_sets.inc();
        }
        if degraded {
            self.degraded_sets.inc();
        }
    }

    /// Record a catalog swap
    pub fn record_catalog_reload(&self, entries: usize, excluded: usize) {
        self.catalog_reloads.inc();
        self.catalog_entries.set(i64::try_from(entries).unwrap_or(i64::MAX));
        self.catalog_excluded.set(i64::try_from(excluded).unwrap_or(i64::MAX));
    }

    /// Record a learning outcome
    pub fn record_learning_outcome(&self, success: bool) {
        let result = if success { "success" } else { "failure" };
        self.learning_outcomes.with_label_values(&[result]).inc();
    }

    /// Record a learning update dropped after retries
    pub fn record_learning_dropped(&self) {
        self.learning_dropped.inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Helper macro to time a pipeline stage
#[macro_export]
macro_rules! time_stage {
    ($stage:expr, $operation:expr) => {{
        let timer = $crate::metrics::METRICS
            .stage_duration
            .with_label_values(&[$stage])
            .start_timer();
        let result = $operation;
        timer.observe_duration();
        result
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        let metrics = Metrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_record_selection() {
        let metrics = Metrics::new().unwrap();
        metrics.record_selection(1200, true, false);
        metrics.record_selection(9000, true, true);
        assert_eq!(metrics.truncated_sets.get(), 2.0);
        assert_eq!(metrics.degraded_sets.get(), 1.0);
    }

    #[test]
    fn test_catalog_reload_gauges() {
        let metrics = Metrics::new().unwrap();
        metrics.record_catalog_reload(12, 3);
        metrics.record_catalog_reload(10, 0);
        assert_eq!(metrics.catalog_reloads.get(), 2.0);
        assert_eq!(metrics.catalog_entries.get(), 10);
        assert_eq!(metrics.catalog_excluded.get(), 0);
    }

    #[test]
    fn test_export_contains_registered_metrics() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("proceed", false);
        metrics.record_learning_outcome(true);
        let text = metrics.export_prometheus();
        assert!(text.contains("orchestrator_requests_total"));
        assert!(text.contains("orchestrator_learning_outcomes_total"));
    }
}
