//! Retry policies for transient transport failures.
//!
//! Only errors for which [`Error::is_retryable`] returns `true` are
//! retried; serialization and validation failures surface immediately.
//!
//! Two modes are available:
//!
//! - [`RetryMode::Standard`]: plain exponential backoff.
//! - [`RetryMode::Adaptive`]: exponential backoff with jitter whose
//!   delay stretches as consecutive transient failures accumulate, so a
//!   struggling target is given progressively more room to recover.
//!
//! # Example
//!
//! ```rust,ignore
//! use quipu_invoke::retry::{with_retry, RetryPolicy};
//!
//! let policy = RetryPolicy::adaptive(3);
//! let response = with_retry(&policy, || async { do_call().await }).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// How backoff delays are computed between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryMode {
    /// Plain exponential backoff: `base * 2^attempt`, capped.
    Standard,
    /// Exponential backoff with jitter that grows with consecutive
    /// transient failures.
    #[default]
    Adaptive,
}

/// Retry policy applied around each invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single backoff delay.
    pub max_delay: Duration,
    /// Backoff mode.
    pub mode: RetryMode,
}

impl RetryPolicy {
    /// Exponential backoff with the given number of retries.
    #[must_use]
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            mode: RetryMode::Standard,
        }
    }

    /// Adaptive backoff with the given number of retries.
    #[must_use]
    pub fn adaptive(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            mode: RetryMode::Adaptive,
        }
    }

    /// Policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            mode: RetryMode::Standard,
        }
    }

    /// Set the delay before the first retry.
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Set the upper bound for any single backoff delay.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Compute the backoff delay before retry number `attempt`
    /// (0-based: the delay after the first failed attempt is
    /// `delay_for(0)`).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        match self.mode {
            RetryMode::Standard => exp,
            RetryMode::Adaptive => {
                // Deterministic decorrelated jitter: spread within
                // [exp/2, exp] and stretch by the failure count so
                // consecutive failures back off harder.
                let half = exp / 2;
                let jitter_steps = u64::from(attempt % 3) + 1;
                let jitter = half
                    .checked_div(4)
                    .unwrap_or(Duration::ZERO)
                    .saturating_mul(u32::try_from(jitter_steps).unwrap_or(1));
                (half + jitter)
                    .saturating_add(self.base_delay.saturating_mul(attempt))
                    .min(self.max_delay)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::adaptive(3)
    }
}

/// Run `op`, retrying transient failures according to `policy`.
///
/// The operation is attempted once plus up to `policy.max_retries`
/// additional times. Non-retryable errors are returned immediately; the
/// last error is returned once the attempt budget is exhausted.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient invocation failure, backing off before retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
