//! Metrics collection and Prometheus export.
//!
//! Initializes the metrics exporter and provides the /metrics endpoint handler.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics recorder.
///
/// Call once at startup before any metrics are recorded. A second call is a
/// no-op that logs a warning.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        tracing::warn!("Metrics recorder already initialized");
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Counts a completed chat turn by outcome (`reply` or `fallback`).
pub fn record_turn(outcome: &'static str) {
    counter!("chat_turns_total", "outcome" => outcome).increment(1);
}

/// Counts a reply generation failure by kind.
pub fn record_generator_failure(kind: &'static str) {
    counter!("chat_generator_failures_total", "kind" => kind).increment(1);
}

pub fn record_session_created() {
    counter!("chat_sessions_created_total").increment(1);
}
