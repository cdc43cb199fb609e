//! Error types surfaced to the orchestrator
//!
//! Fetchers and parsers never raise across the ingestion boundary; they
//! log and return empty. `FetchError` exists for the fetch layer itself,
//! and its `ErrorKind` classification is the single input to the
//! orchestrator's retry/abort decision.

use std::time::Duration;

/// Error produced while fetching one source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("rate limited by server (429)")]
    RateLimited,

    #[error("server error ({status})")]
    Server { status: u16 },

    #[error("resource not found (404)")]
    NotFound,

    #[error("access forbidden (403)")]
    Forbidden,

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("navigation timed out after {0:?}")]
    NavigationTimeout(Duration),

    #[error("anti-bot challenge could not be cleared")]
    Challenge,

    #[error("browser error: {0}")]
    Browser(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Retry classification for a `FetchError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Retried under backoff: timeouts, resets, 5xx, 429.
    Transient,
    /// No retry this fetch: 404, 403, malformed payloads.
    Permanent,
    /// Anti-bot detection that mitigation could not clear. The source is
    /// quarantined until the next scheduled run.
    Challenge,
    /// Propagated to the orchestrator's caller: pool init, config errors.
    Fatal,
}

impl ErrorKind {
    /// Stable label used as the `kind` dimension of error metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::Challenge => "challenge",
            Self::Fatal => "fatal",
        }
    }
}

impl FetchError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout
            | Self::Connection(_)
            | Self::RateLimited
            | Self::Server { .. }
            | Self::NavigationTimeout(_) => ErrorKind::Transient,
            Self::NotFound | Self::Forbidden | Self::Malformed(_) => ErrorKind::Permanent,
            Self::Challenge => ErrorKind::Challenge,
            Self::Browser(_) | Self::Config(_) => ErrorKind::Fatal,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Map an HTTP status to the corresponding error, `None` for success.
    #[must_use]
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            429 => Some(Self::RateLimited),
            404 => Some(Self::NotFound),
            403 => Some(Self::Forbidden),
            500..=599 => Some(Self::Server { status }),
            other => Some(Self::Malformed(format!("unexpected status {other}"))),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16())
                .unwrap_or_else(|| Self::Malformed(err.to_string()))
        } else if err.is_decode() || err.is_body() {
            Self::Malformed(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}
