use std::fmt;
use thiserror::Error;

/// Main error type for the sqlrouter connection router
#[derive(Error, Debug, Clone)]
pub enum RouterError {
    /// Configuration related errors (invalid properties, unknown strategy)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A single connect attempt against one endpoint failed
    #[error("Connect error for {endpoint}: {message}")]
    Connect { endpoint: String, message: String },

    /// The administrative topology query could not be executed
    #[error("Topology query error: {message}")]
    Topology { message: String },

    /// No candidate endpoints were available to attempt
    #[error("No endpoints available: {message}")]
    Unavailable { message: String },

    /// Every endpoint in the attempt sequence failed
    #[error(
        "All {} connection attempts failed: [{}]",
        .failures.len(),
        format_attempts(.failures)
    )]
    AllEndpointsFailed { failures: Vec<AttemptFailure> },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Outcome of one failed connect attempt, kept for aggregate diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub endpoint: String,
    pub reason: String,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.reason)
    }
}

fn format_attempts(failures: &[AttemptFailure]) -> String {
    failures
        .iter()
        .map(|failure| failure.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl RouterError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a per-endpoint connect error
    pub fn connect<E: Into<String>, S: Into<String>>(endpoint: E, message: S) -> Self {
        Self::Connect {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a topology query error
    pub fn topology<S: Into<String>>(message: S) -> Self {
        Self::Topology {
            message: message.into(),
        }
    }

    /// Create an unavailable error
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Aggregate per-endpoint failures, preserving attempt order
    pub fn all_endpoints_failed(failures: Vec<AttemptFailure>) -> Self {
        Self::AllEndpointsFailed { failures }
    }

    /// Check if the error is retryable by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RouterError::Connect { .. }
                | RouterError::Topology { .. }
                | RouterError::Unavailable { .. }
                | RouterError::AllEndpointsFailed { .. }
        )
    }
}

/// Result type alias for sqlrouter operations
pub type RouterResult<T> = Result<T, RouterError>;

/// Convert from anyhow::Error to RouterError
impl From<anyhow::Error> for RouterError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return RouterError::internal(format!("IO error: {}", io_err));
        }
        RouterError::internal(err.to_string())
    }
}
