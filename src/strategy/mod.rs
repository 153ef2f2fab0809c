//! Host ordering strategies
//!
//! A strategy consumes a per-request [`Backend`](crate::backend::Backend) and
//! produces the sequence in which the orchestrator attempts endpoints. The
//! set of strategies is closed and known at compile time, so it is modeled as
//! a tagged union rather than open-ended dynamic dispatch. Stats-aware
//! members additionally accept success/failure feedback after each attempt;
//! the orchestrator checks `is_stats_aware` before feeding timing data back.

pub mod best_response_time;
pub mod round_robin;
pub mod weighted;

pub use best_response_time::BestResponseTime;
pub use round_robin::RoundRobin;
pub use weighted::WeightedClusterRoundRobin;

use std::sync::Arc;

use crate::backend::Backend;
use crate::config::StrategyKind;
use crate::error::RouterResult;
use crate::stats::ResponseTimeStats;

/// The closed set of host ordering strategies
#[derive(Debug)]
pub enum HostOrdering {
    RoundRobin(RoundRobin),
    WeightedClusterRoundRobin(WeightedClusterRoundRobin),
    BestResponseTime(BestResponseTime),
}

impl HostOrdering {
    /// Build the strategy selected by configuration
    pub fn new(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::RoundRobin => HostOrdering::RoundRobin(RoundRobin::new()),
            StrategyKind::GlobalRoundRobin => {
                HostOrdering::WeightedClusterRoundRobin(WeightedClusterRoundRobin::new())
            }
            StrategyKind::BestResponseTime => {
                HostOrdering::BestResponseTime(BestResponseTime::new())
            }
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            HostOrdering::RoundRobin(_) => StrategyKind::RoundRobin,
            HostOrdering::WeightedClusterRoundRobin(_) => StrategyKind::GlobalRoundRobin,
            HostOrdering::BestResponseTime(_) => StrategyKind::BestResponseTime,
        }
    }

    /// Rank the backend's endpoints for one connect attempt sequence
    pub async fn apply(&self, backend: &Backend) -> RouterResult<Vec<String>> {
        match self {
            HostOrdering::RoundRobin(strategy) => Ok(strategy.apply(&backend.endpoints)),
            HostOrdering::WeightedClusterRoundRobin(strategy) => strategy.apply(backend).await,
            HostOrdering::BestResponseTime(strategy) => Ok(strategy.apply(&backend.endpoints)),
        }
    }

    /// Whether this strategy consumes per-attempt success/failure feedback
    pub fn is_stats_aware(&self) -> bool {
        matches!(self, HostOrdering::BestResponseTime(_))
    }

    /// Feed back a successful attempt; no-op for stats-unaware strategies
    pub fn record_success(&self, endpoint: &str, elapsed_ms: u64) {
        if let HostOrdering::BestResponseTime(strategy) = self {
            strategy.record_success(endpoint, elapsed_ms);
        }
    }

    /// Feed back a failed attempt; no-op for stats-unaware strategies
    pub fn record_failure(&self, endpoint: &str) {
        if let HostOrdering::BestResponseTime(strategy) = self {
            strategy.record_failure(endpoint);
        }
    }

    /// Recorded stats for an endpoint, when the strategy keeps any
    pub fn response_stats(&self, endpoint: &str) -> Option<Arc<ResponseTimeStats>> {
        match self {
            HostOrdering::BestResponseTime(strategy) => strategy.stats(endpoint),
            _ => None,
        }
    }
}
