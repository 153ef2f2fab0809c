//! Connector seam and administrative topology query shape
//!
//! The router never speaks the wire protocol itself. A [`Connector`] performs
//! the actual handshake against a single endpoint and hands back a
//! [`Connection`] that can be closed and can answer the administrative
//! topology query. Implementations live outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Properties;
use crate::error::RouterResult;

/// Dials a single endpoint
///
/// Timeouts and cancellation are the connector's responsibility; the router
/// never bounds an attempt by wall-clock time itself.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `endpoint` (a `host:port` string)
    async fn connect(
        &self,
        endpoint: &str,
        properties: &Properties,
    ) -> RouterResult<Box<dyn Connection>>;
}

/// An established connection
#[async_trait]
pub trait Connection: Send {
    /// Close the connection
    async fn close(&mut self) -> RouterResult<()>;

    /// Run the administrative topology query
    ///
    /// Returns one row per server-side session currently open against the
    /// cluster, joined with the owning member's listening address.
    async fn topology(&mut self) -> RouterResult<Vec<TopologyRow>>;
}

/// One row of the administrative topology query result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyRow {
    /// Cluster member instance id, as `ip:status_port`; empty for orphan rows
    pub instance: String,
    /// Reporting client host; set only on the row describing the caller's
    /// own session
    pub client_host: Option<String>,
    /// The member's listening port for client connections
    pub port: u16,
}

impl TopologyRow {
    /// The member's client-facing `host:port`, if the row names a member
    pub fn listen_endpoint(&self) -> Option<String> {
        if self.instance.is_empty() {
            return None;
        }
        let ip = self.instance.split(':').next()?;
        Some(format!("{}:{}", ip, self.port))
    }

    /// Whether this row describes the caller's own session
    pub fn is_own_session(&self) -> bool {
        self.client_host
            .as_deref()
            .is_some_and(|host| !host.is_empty())
    }
}

/// Distinct member endpoints in first-seen order
pub fn member_endpoints(rows: &[TopologyRow]) -> Vec<String> {
    let mut members = Vec::new();
    for row in rows {
        if let Some(endpoint) = row.listen_endpoint() {
            if !members.contains(&endpoint) {
                members.push(endpoint);
            }
        }
    }
    members
}
