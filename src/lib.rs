//! # sqlrouter - client-side connection routing for distributed SQL
//!
//! A distributed SQL database exposes many equivalent front-end endpoints;
//! sqlrouter decides which one to dial for each logical connect request and
//! adapts as cluster membership and node health change, without a central
//! coordinator.
//!
//! ## Core pieces
//!
//! - **Host ordering strategies**: round robin, cluster-load-aware weighted
//!   round robin, and best response time, selected per connection spec
//! - **Topology discovery**: cached endpoint set refreshed under a
//!   failure-count / interval reload policy, poll-driven from connect calls
//! - **Connection orchestration**: retry-over-hosts connect loop with
//!   per-attempt feedback into strategy stats and discovery state
//!
//! The wire protocol stays outside: callers supply a [`Connector`] that
//! performs the actual handshake and answers the administrative topology
//! query. sqlrouter is not a connection pool; every `connect` call routes
//! independently.

pub mod backend;
pub mod config;
pub mod connector;
pub mod discovery;
pub mod error;
pub mod router;
pub mod stats;
pub mod strategy;

// Re-export commonly used types
pub use backend::Backend;
pub use config::{Properties, RouterConfig, StrategyKind};
pub use connector::{Connection, Connector, TopologyRow};
pub use discovery::{ClusterDiscoverer, Discovery};
pub use error::{AttemptFailure, RouterError, RouterResult};
pub use router::{RoutedConnection, Router};
pub use stats::ResponseTimeStats;
pub use strategy::{BestResponseTime, HostOrdering, RoundRobin, WeightedClusterRoundRobin};
