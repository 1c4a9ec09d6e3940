use metrics::{counter, histogram};
use std::time::Instant;

/// Count a finished ceremony step by outcome.
pub fn increment_ceremony(step: &'static str, outcome: &'static str) {
    counter!("ceremony_steps_total", "step" => step, "outcome" => outcome).increment(1);
}

/// Count a request refused by the rate limiter.
pub fn increment_rate_limited(path: &str) {
    counter!("rate_limited_total", "path" => path.to_string()).increment(1);
}

/// Count a login whose sign counter did not advance.
pub fn increment_clone_warning() {
    counter!("credential_clone_warnings_total").increment(1);
}

/// Count a created booking.
pub fn increment_booking_created() {
    counter!("bookings_created_total").increment(1);
}

/// Count an unlock decision by outcome.
pub fn increment_unlock(outcome: &'static str) {
    counter!("door_unlock_attempts_total", "outcome" => outcome).increment(1);
}

/// Track HTTP request latency using a histogram.
pub fn track_http_request(start: Instant, path: &str, method: &str, status: u16) {
    let elapsed = start.elapsed();
    histogram!(
        "http_request_duration_seconds",
        "path" => path.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(elapsed);
}
