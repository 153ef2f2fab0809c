//! Per-request backend data holder

use std::sync::Arc;

use crate::config::Properties;
use crate::connector::Connector;

/// Candidate endpoints plus connection properties for one connect request
///
/// Constructed fresh for every connect call and handed to the active host
/// ordering strategy; never shared across requests.
#[derive(Clone)]
pub struct Backend {
    /// Ordered, unique `host:port` candidate endpoints
    pub endpoints: Vec<String>,
    /// Opaque properties passed through to the connector
    pub properties: Properties,
    /// Connector used for attempts and for administrative queries
    pub connector: Arc<dyn Connector>,
}

impl Backend {
    pub fn new(
        endpoints: Vec<String>,
        properties: Properties,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            endpoints,
            properties,
            connector,
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("endpoints", &self.endpoints)
            .field("properties", &self.properties.len())
            .finish()
    }
}
