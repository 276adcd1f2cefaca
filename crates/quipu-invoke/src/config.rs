//! Client configuration.
//!
//! All knobs are named and overridable even though the chatbot frontend
//! runs on the defaults; the defaults match the connection profile the
//! backend is provisioned for.

use std::time::Duration;

use crate::retry::{RetryMode, RetryPolicy};

/// Default number of retries for transient transport failures.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
/// Default connection pool size per target.
pub const DEFAULT_MAX_POOL_CONNECTIONS: usize = 50;
/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for a synchronous invocation.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection, timeout and retry configuration for an [`InvokeClient`].
///
/// [`InvokeClient`]: crate::client::InvokeClient
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use quipu_invoke::InvokeConfig;
///
/// let config = InvokeConfig::new()
///     .with_max_retry_attempts(5)
///     .with_read_timeout(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeConfig {
    /// Retries after the initial attempt, transient failures only.
    pub max_retry_attempts: u32,
    /// Backoff mode between attempts.
    pub retry_mode: RetryMode,
    /// Maximum idle connections kept in the pool for the target host.
    pub max_pool_connections: usize,
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    /// Timeout for a full request/response round trip.
    pub read_timeout: Duration,
}

impl InvokeConfig {
    /// Configuration with the standard defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            retry_mode: RetryMode::Adaptive,
            max_pool_connections: DEFAULT_MAX_POOL_CONNECTIONS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Set the retry attempt limit.
    #[must_use]
    pub fn with_max_retry_attempts(mut self, max_retry_attempts: u32) -> Self {
        self.max_retry_attempts = max_retry_attempts;
        self
    }

    /// Set the backoff mode.
    #[must_use]
    pub fn with_retry_mode(mut self, retry_mode: RetryMode) -> Self {
        self.retry_mode = retry_mode;
        self
    }

    /// Set the pool size for the target host.
    #[must_use]
    pub fn with_max_pool_connections(mut self, max_pool_connections: usize) -> Self {
        self.max_pool_connections = max_pool_connections;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Retry policy derived from the attempt limit and mode.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        match self.retry_mode {
            RetryMode::Standard => RetryPolicy::exponential(self.max_retry_attempts),
            RetryMode::Adaptive => RetryPolicy::adaptive(self.max_retry_attempts),
        }
    }
}

impl Default for InvokeConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InvokeConfig::new();
        assert_eq!(config.max_retry_attempts, 3);
        assert_eq!(config.retry_mode, RetryMode::Adaptive);
        assert_eq!(config.max_pool_connections, 50);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_default_trait_matches_new() {
        assert_eq!(InvokeConfig::default(), InvokeConfig::new());
    }

    #[test]
    fn test_builder_overrides() {
        let config = InvokeConfig::new()
            .with_max_retry_attempts(5)
            .with_retry_mode(RetryMode::Standard)
            .with_max_pool_connections(10)
            .with_connect_timeout(Duration::from_secs(1))
            .with_read_timeout(Duration::from_secs(2));
        assert_eq!(config.max_retry_attempts, 5);
        assert_eq!(config.retry_mode, RetryMode::Standard);
        assert_eq!(config.max_pool_connections, 10);
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.read_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_retry_policy_reflects_mode() {
        let adaptive = InvokeConfig::new().retry_policy();
        assert_eq!(adaptive.max_retries, 3);
        assert_eq!(adaptive.mode, RetryMode::Adaptive);

        let standard = InvokeConfig::new()
            .with_retry_mode(RetryMode::Standard)
            .with_max_retry_attempts(1)
            .retry_policy();
        assert_eq!(standard.max_retries, 1);
        assert_eq!(standard.mode, RetryMode::Standard);
    }
}
