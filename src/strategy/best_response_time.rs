//! Best response time host ordering

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;

use dashmap::DashMap;

use crate::stats::{now_millis, ResponseTimeStats};

/// Orders endpoints by observed connect latency, failures penalized
///
/// Stats-aware: the orchestrator feeds back elapsed times and failures after
/// every attempt. Endpoints without any recorded stats sort first so that new
/// or recovered members get explored; among endpoints with stats the sort is
/// ascending by effective score. The sort is stable, so ties keep the input
/// order.
#[derive(Debug, Default)]
pub struct BestResponseTime {
    stats: DashMap<String, Arc<ResponseTimeStats>>,
}

impl BestResponseTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, endpoints: &[String]) -> Vec<String> {
        if endpoints.len() <= 1 {
            return endpoints.to_vec();
        }

        let now = now_millis();
        let mut scored: Vec<(String, Option<u64>)> = endpoints
            .iter()
            .map(|endpoint| {
                let score = self
                    .stats
                    .get(endpoint)
                    .map(|stats| stats.effective_score(now));
                (endpoint.clone(), score)
            })
            .collect();

        // Stable sort: no-data endpoints first, then ascending score
        scored.sort_by(|a, b| match (a.1, b.1) {
            (None, None) => CmpOrdering::Equal,
            (None, Some(_)) => CmpOrdering::Less,
            (Some(_), None) => CmpOrdering::Greater,
            (Some(left), Some(right)) => left.cmp(&right),
        });

        scored.into_iter().map(|(endpoint, _)| endpoint).collect()
    }

    /// Record a successful connect with its elapsed time
    pub fn record_success(&self, endpoint: &str, elapsed_ms: u64) {
        self.stats
            .entry(endpoint.to_string())
            .or_default()
            .record_success(elapsed_ms);
    }

    /// Record a failed connect attempt
    pub fn record_failure(&self, endpoint: &str) {
        self.stats
            .entry(endpoint.to_string())
            .or_default()
            .record_failure();
    }

    /// Stats for one endpoint, if any outcome has been recorded for it
    pub fn stats(&self, endpoint: &str) -> Option<Arc<ResponseTimeStats>> {
        self.stats.get(endpoint).map(|entry| Arc::clone(&entry))
    }

    /// Number of endpoints currently tracked
    pub fn tracked_count(&self) -> usize {
        self.stats.len()
    }

    /// Drop stats for one endpoint
    pub fn remove_stats(&self, endpoint: &str) {
        self.stats.remove(endpoint);
    }

    /// Drop all recorded stats
    pub fn clear_stats(&self) {
        self.stats.clear();
    }
}
