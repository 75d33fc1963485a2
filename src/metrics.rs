//! Prometheus metrics
//!
//! Observability for source loading, the composite view, and the refresh scheduler.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

lazy_static! {
    /// Histogram: load duration by kind (seconds)
    pub static ref LOAD_DURATION: HistogramVec = register_histogram_vec!(
        "graphfed_load_duration_seconds",
        "Duration of source loads",
        &["kind"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to create load_duration metric");

    /// Counter: source loads by kind and outcome
    pub static ref LOADS: CounterVec = register_counter_vec!(
        "graphfed_loads_total",
        "Source loads by kind and outcome",
        &["kind", "outcome"]
    )
    .expect("Failed to create loads metric");

    /// Gauge: distinct assertions in the composite view
    pub static ref COMPOSITE_ASSERTIONS: Gauge = register_gauge!(
        "graphfed_composite_assertions",
        "Distinct assertions in the composite view"
    )
    .expect("Failed to create composite_assertions metric");

    /// Gauge: armed refresh tasks
    pub static ref SCHEDULED_TASKS: Gauge = register_gauge!(
        "graphfed_scheduled_tasks",
        "Number of armed refresh tasks"
    )
    .expect("Failed to create scheduled_tasks metric");

    /// Counter: store cache operations (hit/miss)
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec!(
        "graphfed_cache_operations_total",
        "Store cache operations by type",
        &["operation"]
    )
    .expect("Failed to create cache_operations metric");
}

/// Record a finished load
pub fn record_load(kind: &str, success: bool, duration_secs: f64) {
    let outcome = if success { "success" } else { "failure" };
    LOADS.with_label_values(&[kind, outcome]).inc();
    LOAD_DURATION.with_label_values(&[kind]).observe(duration_secs);
}

/// Set the composite assertion count
pub fn set_composite_assertions(count: usize) {
    COMPOSITE_ASSERTIONS.set(count as f64);
}

/// Set the number of armed refresh tasks
pub fn set_scheduled_tasks(count: usize) {
    SCHEDULED_TASKS.set(count as f64);
}

/// Record cache hit
pub fn record_cache_hit() {
    CACHE_OPERATIONS.with_label_values(&["hit"]).inc();
}

/// Record cache miss
pub fn record_cache_miss() {
    CACHE_OPERATIONS.with_label_values(&["miss"]).inc();
}

/// Encode all metrics as Prometheus text format
pub fn encode_metrics() -> crate::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| crate::GraphFedError::Other(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| crate::GraphFedError::Other(format!("Metrics are not UTF-8: {}", e)))
}
