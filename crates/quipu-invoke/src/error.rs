//! Error types for invocation operations.
//!
//! The taxonomy follows the three classes the client distinguishes:
//!
//! - **Transport failures** ([`Error::Network`], [`Error::Timeout`],
//!   [`Error::Throttled`]) are transient and retryable.
//! - **Serialization failures** ([`Error::Serialization`]) are never
//!   retried; the payload will not get better on a second attempt.
//! - **Application-level failures** reported *inside* a successful
//!   response body are not errors at this layer at all — they pass
//!   through to the caller unmodified inside the normal envelope.
//!
//! Use [`Error::is_retryable`] to decide whether a failed attempt is
//! worth repeating.

use thiserror::Error;

/// Result type alias for invocation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the invocation client.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// Network error (connection refused, DNS failure, reset).
    ///
    /// Usually transient and retryable.
    #[error("Network error: {0}")]
    Network(String),

    /// The call did not complete within the configured timeout.
    ///
    /// Retryable; consider a larger read timeout for slow targets.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The transport rejected the request due to throttling (HTTP 429).
    ///
    /// Retryable after backing off.
    #[error("Request throttled: {0}")]
    Throttled(String),

    /// The transport returned a non-success status outside the
    /// invocation contract (5xx from the invocation API itself).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request or response payload could not be encoded/decoded.
    ///
    /// Not retryable.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Input validation error (empty function name, malformed region).
    ///
    /// Not retryable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Client configuration error.
    ///
    /// Not retryable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The invocation API answered with a payload that does not match
    /// the `{"statusCode": .., "body": ..}` contract.
    #[error("API format error: {0}")]
    ApiFormat(String),
}

impl Error {
    /// Create a network error.
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a throttling error.
    pub fn throttled<S: Into<String>>(msg: S) -> Self {
        Self::Throttled(msg.into())
    }

    /// Create an HTTP error.
    pub fn http<S: Into<String>>(msg: S) -> Self {
        Self::Http(msg.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an API format error.
    pub fn api_format<S: Into<String>>(msg: S) -> Self {
        Self::ApiFormat(msg.into())
    }

    /// Check if this error is potentially recoverable via retry.
    ///
    /// Transient transport errors (network, timeout, throttling) may
    /// succeed on a later attempt with backoff. Serialization and
    /// validation errors never will.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout(_) | Error::Throttled(_) | Error::Http(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let base_msg = err.to_string();

        // Host info helps correlate failures across regional endpoints.
        let url_info = err
            .url()
            .map(|u| format!(" (host: {})", u.host_str().unwrap_or("unknown")))
            .unwrap_or_default();

        if err.is_timeout() {
            Error::Timeout(format!("{base_msg}{url_info}"))
        } else if err.is_status() {
            match err.status() {
                Some(status) if status == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    Error::Throttled(format!("{base_msg}{url_info}"))
                }
                _ => Error::Http(format!("{base_msg}{url_info}")),
            }
        } else if err.is_connect() || err.is_request() {
            Error::Network(format!("{base_msg}{url_info}"))
        } else {
            Error::Network(format!("{base_msg}{url_info}"))
        }
    }
}
