//! Per-endpoint response time statistics
//!
//! Counters are plain atomics shared across concurrent connect calls. Updates
//! interleave freely with per-counter atomicity only; a reader may observe a
//! bumped request count before the matching latency lands. The values are
//! advisory ranking inputs, not correctness-critical state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Penalty added to an endpoint's score per recorded failure, in milliseconds
pub const FAILURE_PENALTY_MS: u64 = 5_000;

/// Stats older than this start accruing a staleness penalty, in milliseconds
pub const STATS_STALE_AFTER_MS: u64 = 300_000;

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Response time statistics for a single endpoint
///
/// All counters are monotonically non-decreasing.
#[derive(Debug)]
pub struct ResponseTimeStats {
    total_response_ms: AtomicU64,
    request_count: AtomicU64,
    failure_count: AtomicU64,
    last_update_ms: AtomicU64,
}

impl ResponseTimeStats {
    pub fn new() -> Self {
        Self {
            total_response_ms: AtomicU64::new(0),
            request_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            last_update_ms: AtomicU64::new(now_millis()),
        }
    }

    /// Record a successful connect with its elapsed time
    pub fn record_success(&self, elapsed_ms: u64) {
        self.total_response_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.last_update_ms.store(now_millis(), Ordering::Relaxed);
    }

    /// Record a failed connect attempt
    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        self.last_update_ms.store(now_millis(), Ordering::Relaxed);
    }

    /// Average response time in milliseconds
    ///
    /// `None` until at least one success has been recorded; an endpoint with
    /// failures only has no average, it is never reported as zero.
    pub fn average_response_time(&self) -> Option<u64> {
        let count = self.request_count.load(Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        Some(self.total_response_ms.load(Ordering::Relaxed) / count)
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Failure rate in `[0.0, 1.0]` over all recorded outcomes
    pub fn failure_rate(&self) -> f64 {
        let successes = self.request_count.load(Ordering::Relaxed);
        let failures = self.failure_count.load(Ordering::Relaxed);
        let total = successes + failures;
        if total == 0 {
            return 0.0;
        }
        failures as f64 / total as f64
    }

    pub fn last_update_ms(&self) -> u64 {
        self.last_update_ms.load(Ordering::Relaxed)
    }

    /// Effective ranking score at `now_ms`, lower is better
    ///
    /// `average + failures * 5000 + max(0, age - 300000)`, all in
    /// milliseconds. An endpoint without an average contributes 0 latency and
    /// is ranked purely by its penalties.
    pub fn effective_score(&self, now_ms: u64) -> u64 {
        let mut score = self.average_response_time().unwrap_or(0);
        score += self.failure_count.load(Ordering::Relaxed) * FAILURE_PENALTY_MS;

        let age = now_ms.saturating_sub(self.last_update_ms.load(Ordering::Relaxed));
        score += age.saturating_sub(STATS_STALE_AFTER_MS);

        score
    }
}

impl Default for ResponseTimeStats {
    fn default() -> Self {
        Self::new()
    }
}
