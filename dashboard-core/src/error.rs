//! Error types

use std::time::Duration;

/// Failure of one logical fetch, after the fetcher has given up retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The attempt exceeded its deadline and was aborted
    #[error("Request timed out after {}ms", after.as_millis())]
    Timeout { after: Duration },

    /// Backend answered with a non-2xx status
    #[error("HTTP error! status: {status}")]
    HttpStatus { status: u16 },

    /// Connection-level failure
    #[error("Network error: {message}")]
    Network { message: String },

    /// Body was not JSON, had the wrong shape, or carried an `error` field
    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String },

    /// The store was shut down; nothing was sent
    #[error("Dashboard store is shut down")]
    Closed,
}

impl FetchError {
    /// Short reason tag used in attempt events and status displays
    pub fn reason(&self) -> String {
        match self {
            Self::Timeout { .. } => "timeout".to_string(),
            Self::HttpStatus { status } => format!("httpStatus:{}", status),
            Self::Network { .. } => "network".to_string(),
            Self::MalformedResponse { .. } => "malformedResponse".to_string(),
            Self::Closed => "closed".to_string(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse { reason: reason.into() }
    }
}

/// Invalid dashboard configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

/// Failure to start a dashboard session
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("transport setup failed: {0}")]
    Transport(#[from] crate::logic::sync::TransportError),
}
