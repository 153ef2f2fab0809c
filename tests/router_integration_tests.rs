use async_trait::async_trait;
use dashmap::DashSet;
use std::sync::{Arc, Mutex};

use sqlrouter::{
    Connection, Connector, Discovery, Properties, RouterError, RouterResult, Router, TopologyRow,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Connector stub recording attempt order, with per-endpoint refusal
struct MockConnector {
    refuse: DashSet<String>,
    attempts: Mutex<Vec<String>>,
    /// `None` makes the topology query fail
    rows: Mutex<Option<Vec<TopologyRow>>>,
}

impl MockConnector {
    fn all_up() -> Arc<Self> {
        Arc::new(Self {
            refuse: DashSet::new(),
            attempts: Mutex::new(Vec::new()),
            rows: Mutex::new(None),
        })
    }

    fn with_members(hosts: &[&str]) -> Arc<Self> {
        let connector = Self::all_up();
        *connector.rows.lock().unwrap() = Some(hosts.iter().map(|h| member_row(h)).collect());
        connector
    }

    fn refuse(&self, endpoint: &str) {
        self.refuse.insert(endpoint.to_string());
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        endpoint: &str,
        _properties: &Properties,
    ) -> RouterResult<Box<dyn Connection>> {
        self.attempts.lock().unwrap().push(endpoint.to_string());
        if self.refuse.contains(endpoint) {
            return Err(RouterError::connect(endpoint, "connection refused"));
        }
        Ok(Box::new(MockConnection {
            rows: self.rows.lock().unwrap().clone(),
        }))
    }
}

struct MockConnection {
    rows: Option<Vec<TopologyRow>>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn close(&mut self) -> RouterResult<()> {
        Ok(())
    }

    async fn topology(&mut self) -> RouterResult<Vec<TopologyRow>> {
        self.rows
            .clone()
            .ok_or_else(|| RouterError::internal("simulated query failure"))
    }
}

fn member_row(host: &str) -> TopologyRow {
    TopologyRow {
        instance: format!("{}:10080", host),
        client_host: None,
        port: 4000,
    }
}

fn endpoints(hosts: &[&str]) -> Vec<String> {
    hosts.iter().map(|h| h.to_string()).collect()
}

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

mod router_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_static_round_robin_rotates_across_connects() {
        init_tracing();
        let connector = MockConnector::all_up();
        let router = Router::new(
            connector.clone(),
            endpoints(&["a:4000", "b:4000", "c:4000"]),
            Properties::new(),
        )
        .unwrap();

        let first = router.connect().await.unwrap();
        let second = router.connect().await.unwrap();
        let third = router.connect().await.unwrap();

        assert_eq!(first.endpoint, "a:4000");
        assert_eq!(second.endpoint, "b:4000");
        assert_eq!(third.endpoint, "c:4000");
    }

    /// A failed endpoint is skipped, the next one in order serves the request
    #[tokio::test]
    async fn test_failover_to_next_endpoint() {
        let connector = MockConnector::all_up();
        connector.refuse("a:4000");

        let router = Router::new(
            connector.clone(),
            endpoints(&["a:4000", "b:4000"]),
            Properties::new(),
        )
        .unwrap();

        let routed = router.connect().await.unwrap();
        assert_eq!(routed.endpoint, "b:4000");
        assert_eq!(connector.attempts(), endpoints(&["a:4000", "b:4000"]));
    }

    /// Every endpoint gets exactly one attempt; the aggregate error keeps
    /// per-endpoint causes in attempt order
    #[tokio::test]
    async fn test_all_endpoints_failed_aggregates_in_order() {
        let connector = MockConnector::all_up();
        connector.refuse("a:4000");
        connector.refuse("b:4000");
        connector.refuse("c:4000");

        let router = Router::new(
            connector.clone(),
            endpoints(&["a:4000", "b:4000", "c:4000"]),
            Properties::new(),
        )
        .unwrap();

        let err = router.connect().await.unwrap_err();
        assert!(err.is_retryable());
        match err {
            RouterError::AllEndpointsFailed { failures } => {
                let attempted: Vec<String> =
                    failures.iter().map(|f| f.endpoint.clone()).collect();
                assert_eq!(attempted, endpoints(&["a:4000", "b:4000", "c:4000"]));
                assert!(failures.iter().all(|f| f.reason.contains("refused")));
            }
            other => panic!("expected AllEndpointsFailed, got {:?}", other),
        }
        assert_eq!(
            connector.attempts(),
            endpoints(&["a:4000", "b:4000", "c:4000"])
        );
    }

    /// Attempt outcomes feed the stats-aware strategy, which reorders the
    /// next connect cycle
    #[tokio::test]
    async fn test_best_response_time_feedback_reorders_next_cycle() {
        let connector = MockConnector::all_up();
        connector.refuse("a:4000");

        let router = Router::new(
            connector.clone(),
            endpoints(&["a:4000", "b:4000"]),
            props(&[("router.strategy", "bestresponsetime")]),
        )
        .unwrap();

        let first = router.connect().await.unwrap();
        assert_eq!(first.endpoint, "b:4000");

        let a_stats = router.strategy().response_stats("a:4000").unwrap();
        assert_eq!(a_stats.failure_count(), 1);
        assert_eq!(a_stats.average_response_time(), None);
        let b_stats = router.strategy().response_stats("b:4000").unwrap();
        assert_eq!(b_stats.request_count(), 1);

        // The penalized endpoint now sorts last, so the second cycle goes
        // straight to the healthy one
        let second = router.connect().await.unwrap();
        assert_eq!(second.endpoint, "b:4000");
        assert_eq!(
            connector.attempts(),
            endpoints(&["a:4000", "b:4000", "b:4000"])
        );
    }

    #[tokio::test]
    async fn test_invalid_configuration_fails_before_any_attempt() {
        let connector = MockConnector::all_up();
        let err = Router::new(
            connector.clone(),
            endpoints(&["a:4000"]),
            props(&[("router.discovery-threshold", "abc")]),
        )
        .unwrap_err();

        assert!(matches!(err, RouterError::Config { .. }));
        assert!(!err.is_retryable());
        assert!(connector.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_empty_endpoint_list_is_unavailable() {
        let connector = MockConnector::all_up();
        let router = Router::new(connector.clone(), Vec::new(), Properties::new()).unwrap();

        let err = router.connect().await.unwrap_err();
        assert!(matches!(err, RouterError::Unavailable { .. }));
        assert!(connector.attempts().is_empty());
    }

    /// Dynamic discovery: the first cycle reloads topology from the seed and
    /// routes over the discovered membership
    #[tokio::test]
    async fn test_cluster_discovery_expands_seed_endpoints() {
        init_tracing();
        let connector = MockConnector::with_members(&["a", "b", "c"]);
        let router = Router::with_cluster_discovery(
            connector.clone(),
            endpoints(&["a:4000"]),
            props(&[("router.min-discovery-interval", "0")]),
        )
        .unwrap();

        let routed = router.connect().await.unwrap();
        assert_eq!(routed.endpoint, "a:4000");

        let discovery = router.discovery().unwrap();
        assert_eq!(
            discovery.endpoints(),
            endpoints(&["a:4000", "b:4000", "c:4000"])
        );
    }

    /// Connect failures under dynamic discovery are reported to the
    /// discoverer and excluded from subsequent plain gets
    #[tokio::test]
    async fn test_connect_failures_feed_discoverer() {
        let connector = MockConnector::with_members(&["a", "b"]);
        connector.refuse("a:4000");

        let router = Router::with_cluster_discovery(
            connector.clone(),
            endpoints(&["b:4000"]),
            props(&[("router.min-discovery-interval", "0")]),
        )
        .unwrap();

        let routed = router.connect().await.unwrap();
        assert_eq!(routed.endpoint, "b:4000");

        let discovery = router.discovery().unwrap();
        assert_eq!(discovery.failed_count(), 1);
        assert_eq!(discovery.endpoints(), endpoints(&["b:4000"]));
    }

    /// Closing the routed connection goes through the connector's handle
    #[tokio::test]
    async fn test_routed_connection_closes() {
        let connector = MockConnector::all_up();
        let router = Router::new(connector, endpoints(&["a:4000"]), Properties::new()).unwrap();

        let mut routed = router.connect().await.unwrap();
        routed.connection.close().await.unwrap();
    }
}
