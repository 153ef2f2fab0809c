//! Cluster-load-aware weighted round robin
//!
//! Instead of local feedback, every apply asks the cluster itself: it dials
//! the first configured endpoint, runs the administrative topology query and
//! counts the sessions currently open against each member. The caller's own
//! session is excluded from its member's count.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::backend::Backend;
use crate::connector::TopologyRow;
use crate::error::{RouterError, RouterResult};

/// Orders endpoints ascending by live inbound-connection count
#[derive(Debug, Default)]
pub struct WeightedClusterRoundRobin;

impl WeightedClusterRoundRobin {
    pub fn new() -> Self {
        Self
    }

    pub async fn apply(&self, backend: &Backend) -> RouterResult<Vec<String>> {
        let input = &backend.endpoints;
        if input.len() <= 1 {
            return Ok(input.clone());
        }

        let rows = self.query_topology(backend).await?;
        let counts = connection_counts(&rows);

        // A configured endpoint missing from live membership means the static
        // configuration no longer matches the cluster; fall back to the first
        // configured endpoint and skip balancing this round.
        for endpoint in input {
            if !counts.contains_key(endpoint) {
                warn!(
                    endpoint = %endpoint,
                    "configured endpoint not in discovered membership, skipping load balancing"
                );
                return Ok(vec![input[0].clone()]);
            }
        }

        let mut ordered = input.clone();
        // Stable: ties keep relative input order
        ordered.sort_by_key(|endpoint| counts.get(endpoint).copied().unwrap_or(0));

        debug!(candidates = ordered.len(), "ordered endpoints by cluster load");
        Ok(ordered)
    }

    async fn query_topology(&self, backend: &Backend) -> RouterResult<Vec<TopologyRow>> {
        let endpoint = &backend.endpoints[0];
        let mut connection = backend
            .connector
            .connect(endpoint, &backend.properties)
            .await
            .map_err(|err| {
                RouterError::topology(format!(
                    "no endpoint available to discover cluster load: {}",
                    err
                ))
            })?;

        let result = connection.topology().await;
        if let Err(err) = connection.close().await {
            debug!(endpoint = %endpoint, error = %err, "failed to close topology connection");
        }

        result.map_err(|err| {
            RouterError::topology(format!("cluster load query failed on {}: {}", endpoint, err))
        })
    }
}

/// Per-member inbound-connection counts derived from topology rows
///
/// One count per session row; the caller's own session is subtracted from the
/// member it is connected to.
pub(crate) fn connection_counts(rows: &[TopologyRow]) -> HashMap<String, u32> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut own_endpoint = None;

    for row in rows {
        if let Some(endpoint) = row.listen_endpoint() {
            if row.is_own_session() {
                own_endpoint = Some(endpoint.clone());
            }
            *counts.entry(endpoint).or_insert(0) += 1;
        }
    }

    if let Some(endpoint) = own_endpoint {
        if let Some(count) = counts.get_mut(&endpoint) {
            *count = count.saturating_sub(1);
        }
    }

    counts
}
