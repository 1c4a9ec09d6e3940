//! Prometheus metrics implementation.
//!
//! Concrete `Metrics` backed by the global `metrics` registry. The helpers in
//! `counters.rs` register series on first use; the handle kept by
//! `recorder.rs` renders them in Prometheus text format.

use crate::domain::Metrics;
use std::time::Instant;

/// Prometheus-based metrics implementation.
///
/// Stateless: every series lives in the global registry.
pub struct PrometheusMetrics;

impl PrometheusMetrics {
    pub fn new() -> Self {
        tracing::info!("Creating Prometheus metrics");
        PrometheusMetrics
    }
}

impl Metrics for PrometheusMetrics {
    // ---
    fn render(&self) -> String {
        super::render_metrics()
    }

    fn record_ceremony(&self, step: &'static str, outcome: &'static str) {
        super::increment_ceremony(step, outcome);
    }

    fn record_rate_limited(&self, path: &str) {
        super::increment_rate_limited(path);
    }

    fn record_clone_warning(&self) {
        tracing::debug!("Recording clone warning");
        super::increment_clone_warning();
    }

    fn record_booking_created(&self) {
        super::increment_booking_created();
    }

    fn record_unlock(&self, outcome: &'static str) {
        super::increment_unlock(outcome);
    }

    fn record_http_request(&self, start: Instant, path: &str, method: &str, status: u16) {
        super::track_http_request(start, path, method, status);
    }
}
