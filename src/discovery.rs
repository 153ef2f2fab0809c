//! Topology discovery
//!
//! The discoverer caches the set of reachable endpoints and refreshes it
//! through the administrative topology query. Refreshes are purely
//! poll-driven: the orchestrator evaluates the reload decision on every
//! connect cycle, there is no background task. A reload is forced once enough
//! endpoint failures accumulate or the cache grows too old, debounced by a
//! minimum interval. Reload failures degrade silently to the previous cache:
//! discovery favors continued availability over freshness.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use dashmap::DashSet;
use tracing::{debug, info, warn};

use crate::config::{Properties, RouterConfig};
use crate::connector::{member_endpoints, Connector};
use crate::error::RouterResult;
use crate::stats::now_millis;

/// Topology discovery seam
///
/// Long-lived, shared across concurrent connect calls. Implementations must
/// tolerate concurrent `endpoints` / `get_and_reload` invocations; duplicate
/// concurrent reloads are idempotent.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Cached endpoints with currently-failed ones filtered out
    ///
    /// Never triggers a refresh by itself.
    fn endpoints(&self) -> Vec<String>;

    /// Run the topology query and replace the cache
    ///
    /// On query failure the previous cached list is returned unchanged and
    /// failed-state is left untouched; no error surfaces.
    async fn get_and_reload(&self) -> Vec<String>;

    /// Note a failed endpoint; it is excluded from `endpoints()` until the
    /// next successful reload
    fn record_failure(&self, endpoint: &str);

    /// Whether a reload is due
    ///
    /// Due when `failed_count >= threshold` or the cache is older than the
    /// maximum interval, suppressed inside the minimum interval unless
    /// `forced`.
    fn should_reload(&self, forced: bool) -> bool;

    /// Failures observed since the last successful reload
    fn failed_count(&self) -> u64;

    /// Configured reload threshold
    fn reload_threshold(&self) -> u32;

    /// Evaluate the reload decision, then serve the (possibly refreshed) cache
    async fn refresh_if_needed(&self) -> Vec<String> {
        if self.should_reload(false) {
            self.get_and_reload().await
        } else {
            self.endpoints()
        }
    }
}

/// The reload gate, kept separate so it can be tested without a clock
pub(crate) fn reload_due(
    failed_count: u64,
    threshold: u32,
    elapsed_ms: u64,
    min_interval_ms: u64,
    max_interval_ms: u64,
    forced: bool,
) -> bool {
    if forced {
        return true;
    }
    let due = failed_count >= u64::from(threshold) || elapsed_ms >= max_interval_ms;
    due && elapsed_ms >= min_interval_ms
}

/// Discoverer backed by the administrative topology query
pub struct ClusterDiscoverer {
    connector: Arc<dyn Connector>,
    properties: Properties,
    cached: ArcSwap<Vec<String>>,
    failed: DashSet<String>,
    failed_count: AtomicU64,
    last_reload_ms: AtomicU64,
    threshold: u32,
    min_interval_ms: u64,
    max_interval_ms: u64,
}

impl std::fmt::Debug for ClusterDiscoverer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterDiscoverer")
            .field("properties", &self.properties)
            .field("cached", &self.cached.load())
            .field("failed_count", &self.failed_count)
            .field("last_reload_ms", &self.last_reload_ms)
            .field("threshold", &self.threshold)
            .field("min_interval_ms", &self.min_interval_ms)
            .field("max_interval_ms", &self.max_interval_ms)
            .finish_non_exhaustive()
    }
}

impl ClusterDiscoverer {
    /// Create a discoverer seeded with the statically configured endpoints
    ///
    /// The seed serves until the first successful reload; the first connect
    /// cycle is always considered due.
    pub fn new(
        connector: Arc<dyn Connector>,
        seed_endpoints: Vec<String>,
        properties: Properties,
        config: &RouterConfig,
    ) -> RouterResult<Self> {
        config.validate()?;

        Ok(Self {
            connector,
            properties,
            cached: ArcSwap::from_pointee(seed_endpoints),
            failed: DashSet::new(),
            failed_count: AtomicU64::new(0),
            // 0 marks the seed as stale so the first cycle reloads
            last_reload_ms: AtomicU64::new(0),
            threshold: config.discovery_threshold,
            min_interval_ms: config.min_discovery_interval.as_millis() as u64,
            max_interval_ms: config.max_discovery_interval.as_millis() as u64,
        })
    }

    /// Dial cached endpoints in order until one answers the topology query
    async fn query_members(&self) -> Option<Vec<String>> {
        let candidates = self.cached.load_full();
        for endpoint in candidates.iter() {
            let mut connection = match self
                .connector
                .connect(endpoint, &self.properties)
                .await
            {
                Ok(connection) => connection,
                Err(err) => {
                    debug!(endpoint = %endpoint, error = %err, "discovery dial failed");
                    continue;
                }
            };

            let result = connection.topology().await;
            if let Err(err) = connection.close().await {
                debug!(endpoint = %endpoint, error = %err, "failed to close discovery connection");
            }

            match result {
                Ok(rows) => {
                    let members = member_endpoints(&rows);
                    if members.is_empty() {
                        warn!(endpoint = %endpoint, "topology query returned no members");
                        continue;
                    }
                    return Some(members);
                }
                Err(err) => {
                    debug!(endpoint = %endpoint, error = %err, "topology query failed");
                }
            }
        }
        None
    }
}

#[async_trait]
impl Discovery for ClusterDiscoverer {
    fn endpoints(&self) -> Vec<String> {
        self.cached
            .load()
            .iter()
            .filter(|endpoint| !self.failed.contains(endpoint.as_str()))
            .cloned()
            .collect()
    }

    async fn get_and_reload(&self) -> Vec<String> {
        match self.query_members().await {
            Some(members) => {
                self.cached.store(Arc::new(members.clone()));
                self.failed.clear();
                self.failed_count.store(0, Ordering::Relaxed);
                self.last_reload_ms.store(now_millis(), Ordering::Relaxed);
                info!(members = members.len(), "cluster topology reloaded");
                members
            }
            None => {
                // Keep serving the previous cache, failed-state untouched
                warn!("topology reload failed, keeping cached endpoints");
                self.cached.load_full().as_ref().clone()
            }
        }
    }

    fn record_failure(&self, endpoint: &str) {
        self.failed.insert(endpoint.to_string());
        let failed = self.failed_count.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(endpoint = %endpoint, failed, "endpoint failure recorded");
    }

    fn should_reload(&self, forced: bool) -> bool {
        let elapsed = now_millis().saturating_sub(self.last_reload_ms.load(Ordering::Relaxed));
        reload_due(
            self.failed_count.load(Ordering::Relaxed),
            self.threshold,
            elapsed,
            self.min_interval_ms,
            self.max_interval_ms,
            forced,
        )
    }

    fn failed_count(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }

    fn reload_threshold(&self) -> u32 {
        self.threshold
    }
}
