//! Error types for the probe engine
//!
//! A `ProbeError` means the probe itself could not be carried out properly.
//! An unhealthy target is never an error: it is reported as a
//! [`ProbeResult`](crate::contracts::ProbeResult) on a successful run.

use crate::contracts::ProbeResult;
use thiserror::Error;

/// Errors raised while running a probe
#[derive(Error, Debug)]
pub enum ProbeError {
    /// No handler populated on the probe
    #[error("missing probe handler for {target}")]
    MissingHandler { target: String },

    /// More than one handler populated on the probe
    #[error("ambiguous probe handler for {target}: {kinds} are all set")]
    MultipleHandlers { target: String, kinds: String },

    /// Port name neither declared by the container nor numeric
    #[error("port {name} not found")]
    UnresolvedPort { name: String },

    /// Port outside (0, 65535]
    #[error("invalid port number: {port}")]
    InvalidPort { port: i64 },

    /// Scheme, host and port do not form a URL
    #[error("invalid probe URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// TCP address cannot be parsed
    #[error("invalid TCP address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Configured User-Agent cannot be sent as a header value
    #[error("invalid User-Agent {value:?}: {reason}")]
    InvalidUserAgent { value: String, reason: String },

    /// Exec action without a command
    #[error("exec probe command cannot be empty")]
    EmptyCommand,

    /// The response arrived but its body could not be read
    #[error("failed to read response body from {url}: {source}")]
    ResponseBody {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl ProbeError {
    /// Create an invalid address error
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        ProbeError::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid URL error
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        ProbeError::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_user_agent(value: impl Into<String>, reason: impl ToString) -> Self {
        ProbeError::InvalidUserAgent {
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    /// Classification reported alongside this error
    pub fn result(&self) -> ProbeResult {
        match self {
            ProbeError::ResponseBody { .. } => ProbeResult::Failure,
            _ => ProbeResult::Unknown,
        }
    }

    /// Check if the probe definition (not the session) is at fault
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ProbeError::MissingHandler { .. }
                | ProbeError::MultipleHandlers { .. }
                | ProbeError::UnresolvedPort { .. }
                | ProbeError::InvalidPort { .. }
                | ProbeError::InvalidUrl { .. }
                | ProbeError::InvalidAddress { .. }
                | ProbeError::InvalidUserAgent { .. }
                | ProbeError::EmptyCommand
        )
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, ProbeError>;
