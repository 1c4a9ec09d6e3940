use std::sync::Arc;
use std::time::Instant;

/// Abstraction for application metrics (counters, histograms).
pub trait Metrics: Send + Sync + 'static {
    // ---
    /// Render current metrics in Prometheus text format.
    fn render(&self) -> String;

    /// Record the end of a ceremony step, e.g. ("login_finish", "success").
    fn record_ceremony(&self, step: &'static str, outcome: &'static str);

    /// Record a request turned away by the rate limiter.
    fn record_rate_limited(&self, path: &str);

    /// Record a login whose sign counter did not advance.
    fn record_clone_warning(&self);

    /// Record a newly created booking.
    fn record_booking_created(&self);

    /// Record the decision of an unlock attempt.
    fn record_unlock(&self, outcome: &'static str);

    /// Record HTTP request duration and labels.
    fn record_http_request(&self, start: Instant, path: &str, method: &str, status: u16);
}

/// Type alias for any backend that implements Metrics.
pub type MetricsPtr = Arc<dyn Metrics>;
