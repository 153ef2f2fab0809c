//! Connection property parsing and validation
//!
//! The router receives an opaque key/value property bag alongside the endpoint
//! list. This module extracts the keys the router itself recognizes, applies
//! defaults for absent keys, and fails fast on invalid values. All remaining
//! properties are passed through to the connector untouched.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RouterError, RouterResult};

/// Opaque connection properties forwarded to the connector
pub type Properties = HashMap<String, String>;

/// Property key selecting the host ordering strategy
pub const PROP_STRATEGY: &str = "router.strategy";
/// Property key for the discovery reload threshold (failure count)
pub const PROP_DISCOVERY_THRESHOLD: &str = "router.discovery-threshold";
/// Property key for the minimum interval between reloads, in milliseconds
pub const PROP_MIN_DISCOVERY_INTERVAL: &str = "router.min-discovery-interval";
/// Property key for the maximum age of a cached topology, in milliseconds
pub const PROP_MAX_DISCOVERY_INTERVAL: &str = "router.max-discovery-interval";

/// Reload after this many endpoint failures unless configured otherwise
pub const DEFAULT_DISCOVERY_THRESHOLD: u32 = 3;
/// Debounce window between two topology reloads
pub const DEFAULT_MIN_DISCOVERY_INTERVAL_MS: u64 = 1_000;
/// A cached topology older than this is reloaded on the next connect cycle
pub const DEFAULT_MAX_DISCOVERY_INTERVAL_MS: u64 = 300_000;

/// Host ordering strategy selector
///
/// A closed set: the variants are known at compile time and selected through
/// the `router.strategy` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Rotate through endpoints with an atomic cursor
    RoundRobin,
    /// Order endpoints by live cluster connection counts (fewest first)
    GlobalRoundRobin,
    /// Order endpoints by observed response time, failures penalized
    BestResponseTime,
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::RoundRobin
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::RoundRobin => write!(f, "roundrobin"),
            StrategyKind::GlobalRoundRobin => write!(f, "globalroundrobin"),
            StrategyKind::BestResponseTime => write!(f, "bestresponsetime"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "roundrobin" => Ok(StrategyKind::RoundRobin),
            "globalroundrobin" => Ok(StrategyKind::GlobalRoundRobin),
            "bestresponsetime" => Ok(StrategyKind::BestResponseTime),
            other => Err(RouterError::config(format!(
                "Unknown value for {}: {} (expected roundrobin, globalroundrobin or bestresponsetime)",
                PROP_STRATEGY, other
            ))),
        }
    }
}

/// Router configuration extracted from the property bag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Active host ordering strategy
    pub strategy: StrategyKind,
    /// Failure count that forces a topology reload, must be >= 1
    pub discovery_threshold: u32,
    /// Reloads closer together than this are suppressed unless forced
    pub min_discovery_interval: Duration,
    /// A cache older than this is due for reload
    pub max_discovery_interval: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            discovery_threshold: DEFAULT_DISCOVERY_THRESHOLD,
            min_discovery_interval: Duration::from_millis(DEFAULT_MIN_DISCOVERY_INTERVAL_MS),
            max_discovery_interval: Duration::from_millis(DEFAULT_MAX_DISCOVERY_INTERVAL_MS),
        }
    }
}

impl RouterConfig {
    /// Parse the recognized keys out of a property bag
    ///
    /// Absent or empty keys fall back to defaults; present but invalid values
    /// are a configuration error, never silently defaulted.
    pub fn from_properties(properties: &Properties) -> RouterResult<Self> {
        let strategy = match trimmed(properties, PROP_STRATEGY) {
            Some(raw) => raw.parse::<StrategyKind>()?,
            None => StrategyKind::default(),
        };

        let config = Self {
            strategy,
            discovery_threshold: parse_threshold(properties)?,
            min_discovery_interval: Duration::from_millis(parse_interval(
                properties,
                PROP_MIN_DISCOVERY_INTERVAL,
                DEFAULT_MIN_DISCOVERY_INTERVAL_MS,
            )?),
            max_discovery_interval: Duration::from_millis(parse_interval(
                properties,
                PROP_MAX_DISCOVERY_INTERVAL,
                DEFAULT_MAX_DISCOVERY_INTERVAL_MS,
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration as a whole
    pub fn validate(&self) -> RouterResult<()> {
        if self.discovery_threshold < 1 {
            return Err(RouterError::config(format!(
                "{} must be >= 1, got: {}",
                PROP_DISCOVERY_THRESHOLD, self.discovery_threshold
            )));
        }

        if self.min_discovery_interval > self.max_discovery_interval {
            return Err(RouterError::config(format!(
                "{} ({:?}) must not exceed {} ({:?})",
                PROP_MIN_DISCOVERY_INTERVAL,
                self.min_discovery_interval,
                PROP_MAX_DISCOVERY_INTERVAL,
                self.max_discovery_interval
            )));
        }

        Ok(())
    }
}

fn trimmed<'a>(properties: &'a Properties, key: &str) -> Option<&'a str> {
    properties
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

/// Parse the reload threshold, defaulting only when the key is absent
fn parse_threshold(properties: &Properties) -> RouterResult<u32> {
    let raw = match trimmed(properties, PROP_DISCOVERY_THRESHOLD) {
        Some(raw) => raw,
        None => return Ok(DEFAULT_DISCOVERY_THRESHOLD),
    };

    let threshold: i64 = raw.parse().map_err(|_| {
        RouterError::config(format!(
            "Invalid value for {}: {}",
            PROP_DISCOVERY_THRESHOLD, raw
        ))
    })?;

    if threshold < 1 {
        return Err(RouterError::config(format!(
            "{} must be >= 1, got: {}",
            PROP_DISCOVERY_THRESHOLD, threshold
        )));
    }

    Ok(threshold as u32)
}

fn parse_interval(properties: &Properties, key: &str, default_ms: u64) -> RouterResult<u64> {
    let raw = match trimmed(properties, key) {
        Some(raw) => raw,
        None => return Ok(default_ms),
    };

    raw.parse::<u64>()
        .map_err(|_| RouterError::config(format!("Invalid value for {}: {}", key, raw)))
}
