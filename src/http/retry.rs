//! Retry policy
//!
//! The retrier is a stateless decision function over one HTTP response:
//! whether to retry it, and how long to wait first. The requester delegates
//! its whole retry surface here and adds no logic of its own; no state is
//! carried across separate page fetches beyond the configured policy.

use crate::error::is_retryable_status;
use reqwest::Response;
use std::time::Duration;

/// Upper bound on any computed backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Retry budget and growth factor for one requester
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Maximum number of retry attempts per page fetch
    pub max_retries: u32,
    /// Base of the exponential delay, in seconds
    pub retry_factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_factor: 5.0,
        }
    }
}

/// Trait for per-response retry decisions
pub trait Retrier: Send + Sync {
    /// Whether this response should be retried. Deterministic: the same
    /// response classification always yields the same answer.
    fn should_retry(&self, response: &Response) -> bool;

    /// Server-directed wait before the next attempt, if the response names
    /// one (e.g. `Retry-After`). `None` means the caller computes the delay
    /// from the retry factor.
    fn backoff_time(&self, response: &Response) -> Option<Duration>;

    /// The retry budget, if bounded
    fn max_retries(&self) -> Option<u32>;

    /// Base of the exponential delay, in seconds
    fn retry_factor(&self) -> f64;
}

/// Default retrier: retries 429 and server errors, honors `Retry-After`
#[derive(Debug, Clone, Default)]
pub struct ExponentialBackoffRetrier {
    policy: BackoffPolicy,
}

impl ExponentialBackoffRetrier {
    /// Create a retrier with the given policy
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy }
    }
}

impl Retrier for ExponentialBackoffRetrier {
    fn should_retry(&self, response: &Response) -> bool {
        is_retryable_status(response.status().as_u16())
    }

    fn backoff_time(&self, response: &Response) -> Option<Duration> {
        response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    fn max_retries(&self) -> Option<u32> {
        Some(self.policy.max_retries)
    }

    fn retry_factor(&self) -> f64 {
        self.policy.retry_factor
    }
}

/// Compute the exponential delay for a retry attempt: `factor * 2^attempt`
/// seconds, capped at [`MAX_BACKOFF`]
pub fn exponential_backoff(retry_factor: f64, attempt: u32) -> Duration {
    let secs = retry_factor * 2f64.powi(attempt as i32);
    let delay = Duration::from_secs_f64(secs.max(0.0));
    std::cmp::min(delay, MAX_BACKOFF)
}
