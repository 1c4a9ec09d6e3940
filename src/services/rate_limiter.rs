//! Per-client token-bucket admission control.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::config::RateLimitConfig;

/// Token bucket rate limiter keyed by client address.
///
/// Buckets are created full on first sight of a key. A periodic sweep drops
/// buckets that have refilled completely; partially drained buckets stay,
/// however long they have been idle.
pub struct RateLimiter {
    /// Map of client key -> bucket
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
    /// Tokens added per second
    rate: f64,
    /// Bucket capacity
    capacity: f64,
    /// Notify for shutdown
    shutdown: Arc<Notify>,
}

#[derive(Clone, Copy, Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    fn refill(&mut self, rate: f64, capacity: f64, now: Instant) {
        // Instants from other threads can be marginally behind ours.
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(capacity);
        self.last_refill = now;
    }
}

impl RateLimiter {
    /// Create a limiter adding `rate` tokens per second up to `capacity`.
    pub fn new(rate: f64, capacity: u32) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            rate,
            capacity: f64::from(capacity),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.per_second, config.burst)
    }

    /// Admit one request for `key` if a token is available.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// [`allow`](Self::allow) against an explicit clock reading.
    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut map = self.buckets.lock();
        let bucket = map
            .entry(key.to_string())
            .or_insert_with(|| Bucket::full(self.capacity, now));

        bucket.refill(self.rate, self.capacity, now);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop every bucket that is full at `now`. Returns how many were removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut map = self.buckets.lock();
        let before = map.len();
        let (rate, capacity) = (self.rate, self.capacity);
        map.retain(|_, bucket| {
            bucket.refill(rate, capacity, now);
            bucket.tokens < capacity
        });
        before - map.len()
    }

    /// Number of tracked client keys.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Start the background sweep task.
    pub fn start_cleanup_task(self: &Arc<Self>, sweep_interval: Duration) {
        let limiter = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.notified() => {
                        debug!("rate limiter sweep task shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(sweep_interval) => {
                        let Some(limiter) = limiter.upgrade() else { break };
                        let removed = limiter.sweep_at(Instant::now());
                        if removed > 0 {
                            debug!(removed, remaining = limiter.tracked_keys(), "idle rate limit buckets swept");
                        }
                    }
                }
            }
        });
    }

    /// Signal shutdown to the sweep task.
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
