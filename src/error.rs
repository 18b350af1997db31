//! Error types for searching, fetching and parsing

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to callers of a search
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Country {0} not supported")]
    UnsupportedCountry(String),
}

/// Failure fetching one vendor page. Always recovered locally.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::RateLimited { .. } | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Client(_) => false,
        }
    }
}

/// Failure extracting a single listing container from a page
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("container is missing its {0} element")]
    MissingElement(&'static str),

    #[error("no numeric price in {0:?}")]
    NoPrice(String),

    #[error("invalid link {href}: {reason}")]
    InvalidLink { href: String, reason: String },
}

/// Invalid engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },

    #[error("{0}")]
    Inconsistent(String),
}
