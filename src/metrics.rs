//! Prometheus metrics for the MiniGram service.
//!
//! The cache layer only produces observations here; the rendered text is
//! served on `GET /metrics`.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_ERRORS_TOTAL: &str = "cache_errors_total";
    pub const CACHE_OPERATION_DURATION_SECONDS: &str = "cache_operation_duration_seconds";
    pub const CACHE_INVALIDATED_KEYS_TOTAL: &str = "cache_invalidated_keys_total";
    pub const CACHE_WARM_RUNS_TOTAL: &str = "cache_warm_runs_total";
}

/// Initialize the Prometheus metrics exporter.
///
/// Returns `true` if initialization succeeded, `false` if already initialized
/// or the recorder could not be installed.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }

            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

// =============================================================================
// Cache Metrics
// =============================================================================

pub fn record_cache_hit(cache_type: &str, instance: &str) {
    counter!(
        names::CACHE_HITS_TOTAL,
        "cache_type" => cache_type.to_string(),
        "instance" => instance.to_string()
    )
    .increment(1);
}

pub fn record_cache_miss(cache_type: &str, instance: &str) {
    counter!(
        names::CACHE_MISSES_TOTAL,
        "cache_type" => cache_type.to_string(),
        "instance" => instance.to_string()
    )
    .increment(1);
}

pub fn record_cache_error(operation: &str, cache_type: &str, instance: &str) {
    counter!(
        names::CACHE_ERRORS_TOTAL,
        "operation" => operation.to_string(),
        "cache_type" => cache_type.to_string(),
        "instance" => instance.to_string()
    )
    .increment(1);
}

/// Record the latency of one cache operation.
pub fn record_cache_operation(operation: &str, cache_type: &str, instance: &str, duration: Duration) {
    histogram!(
        names::CACHE_OPERATION_DURATION_SECONDS,
        "operation" => operation.to_string(),
        "cache_type" => cache_type.to_string(),
        "instance" => instance.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_invalidated_keys(instance: &str, count: usize) {
    counter!(
        names::CACHE_INVALIDATED_KEYS_TOTAL,
        "instance" => instance.to_string()
    )
    .increment(count as u64);
}

pub fn record_warm_run(instance: &str) {
    counter!(
        names::CACHE_WARM_RUNS_TOTAL,
        "instance" => instance.to_string()
    )
    .increment(1);
}
