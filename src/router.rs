//! Connection orchestrator
//!
//! The front door of the crate: resolves candidate endpoints (statically or
//! through discovery), asks the active strategy to rank them, then walks the
//! ranked sequence giving each endpoint exactly one attempt. The first
//! success wins; outcomes are fed back to the strategy's stats and to the
//! discoverer as attempts complete.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::backend::Backend;
use crate::config::{Properties, RouterConfig};
use crate::connector::{Connection, Connector};
use crate::discovery::{ClusterDiscoverer, Discovery};
use crate::error::{AttemptFailure, RouterError, RouterResult};
use crate::strategy::HostOrdering;

/// A successfully routed connection and the endpoint that served it
pub struct RoutedConnection {
    pub endpoint: String,
    pub connection: Box<dyn Connection>,
}

impl std::fmt::Debug for RoutedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutedConnection")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Routes connect requests over the configured endpoints
///
/// Long-lived; shared strategy stats and discovery state have the same
/// lifetime as the router instance. Concurrent `connect` calls are safe.
pub struct Router {
    connector: Arc<dyn Connector>,
    endpoints: Vec<String>,
    properties: Properties,
    config: RouterConfig,
    strategy: HostOrdering,
    discovery: Option<Arc<dyn Discovery>>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("endpoints", &self.endpoints)
            .field("properties", &self.properties)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Build a router over a static endpoint list
    ///
    /// Configuration is parsed from the property bag; invalid values fail
    /// here, before any connection attempt.
    pub fn new(
        connector: Arc<dyn Connector>,
        endpoints: Vec<String>,
        properties: Properties,
    ) -> RouterResult<Self> {
        let config = RouterConfig::from_properties(&properties)?;
        let strategy = HostOrdering::new(config.strategy);

        Ok(Self {
            connector,
            endpoints,
            properties,
            config,
            strategy,
            discovery: None,
        })
    }

    /// Build a router that refreshes its endpoints via cluster discovery
    ///
    /// The configured endpoints seed the discoverer's cache.
    pub fn with_cluster_discovery(
        connector: Arc<dyn Connector>,
        endpoints: Vec<String>,
        properties: Properties,
    ) -> RouterResult<Self> {
        let mut router = Self::new(Arc::clone(&connector), endpoints.clone(), properties)?;
        let discoverer = ClusterDiscoverer::new(
            connector,
            endpoints,
            router.properties.clone(),
            &router.config,
        )?;
        router.discovery = Some(Arc::new(discoverer));
        Ok(router)
    }

    /// Replace the discovery implementation
    pub fn with_discovery(mut self, discovery: Arc<dyn Discovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn strategy(&self) -> &HostOrdering {
        &self.strategy
    }

    pub fn discovery(&self) -> Option<&Arc<dyn Discovery>> {
        self.discovery.as_ref()
    }

    /// Open a connection, trying endpoints in strategy order
    ///
    /// Each endpoint gets exactly one attempt per call. Returns the first
    /// success, or an aggregated error carrying every per-endpoint failure in
    /// attempt order.
    pub async fn connect(&self) -> RouterResult<RoutedConnection> {
        let candidates = match &self.discovery {
            Some(discovery) => discovery.refresh_if_needed().await,
            None => self.endpoints.clone(),
        };

        if candidates.is_empty() {
            return Err(RouterError::unavailable(
                "no candidate endpoints to connect to",
            ));
        }

        let backend = Backend::new(
            candidates,
            self.properties.clone(),
            Arc::clone(&self.connector),
        );
        let ordered = self.strategy.apply(&backend).await?;

        let mut failures = Vec::new();
        for endpoint in &ordered {
            let started = Instant::now();
            match self.connector.connect(endpoint, &self.properties).await {
                Ok(connection) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    if self.strategy.is_stats_aware() {
                        self.strategy.record_success(endpoint, elapsed_ms);
                    }
                    debug!(
                        endpoint = %endpoint,
                        elapsed_ms,
                        attempt = failures.len() + 1,
                        "connection established"
                    );
                    return Ok(RoutedConnection {
                        endpoint: endpoint.clone(),
                        connection,
                    });
                }
                Err(err) => {
                    warn!(endpoint = %endpoint, error = %err, "connect attempt failed");
                    if self.strategy.is_stats_aware() {
                        self.strategy.record_failure(endpoint);
                    }
                    if let Some(discovery) = &self.discovery {
                        discovery.record_failure(endpoint);
                    }
                    failures.push(AttemptFailure {
                        endpoint: endpoint.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        Err(RouterError::all_endpoints_failed(failures))
    }
}
