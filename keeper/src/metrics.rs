//! Counters for the upkeep keeper.
//!
//! All counters are backed by atomics for lock-free concurrent access.

use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregated keeper metrics, shared via `Arc<Metrics>`.
pub struct Metrics {
    /// Polls that read the raffle and simulated `check_upkeep`.
    pub checks: AtomicU64,
    /// `perform_upkeep` transactions confirmed.
    pub upkeeps_performed: AtomicU64,
    /// Polls or upkeeps that failed for a retryable reason.
    pub upkeeps_failed: AtomicU64,
    /// Sum of upkeep latencies in milliseconds (for computing average).
    pub upkeep_latency_sum_ms: AtomicU64,
    /// Callback-account resolutions served over HTTP.
    pub callbacks_resolved: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            checks: AtomicU64::new(0),
            upkeeps_performed: AtomicU64::new(0),
            upkeeps_failed: AtomicU64::new(0),
            upkeep_latency_sum_ms: AtomicU64::new(0),
            callbacks_resolved: AtomicU64::new(0),
        }
    }

    pub fn record_check(&self) {
        self.checks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a confirmed upkeep with its latency.
    pub fn record_upkeep(&self, latency_ms: u64) {
        self.upkeeps_performed.fetch_add(1, Ordering::Relaxed);
        self.upkeep_latency_sum_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.upkeeps_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_callback_resolved(&self) {
        self.callbacks_resolved.fetch_add(1, Ordering::Relaxed);
    }

    /// Average upkeep latency in milliseconds, or 0 if none.
    pub fn avg_latency_ms(&self) -> u64 {
        let count = self.upkeeps_performed.load(Ordering::Relaxed);
        if count == 0 {
            return 0;
        }
        self.upkeep_latency_sum_ms.load(Ordering::Relaxed) / count
    }

    /// Serialize metrics as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "checks": self.checks.load(Ordering::Relaxed),
            "upkeeps_performed": self.upkeeps_performed.load(Ordering::Relaxed),
            "upkeeps_failed": self.upkeeps_failed.load(Ordering::Relaxed),
            "avg_upkeep_latency_ms": self.avg_latency_ms(),
            "callbacks_resolved": self.callbacks_resolved.load(Ordering::Relaxed),
        })
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
