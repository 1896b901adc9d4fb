//! Bounded exponential backoff shared by tool invocation and model calls.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Largest exponent applied to the base delay; keeps the shift in range.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Retry schedule with exponential backoff.
///
/// Attempt `n` (zero-based retry index) waits `base_delay * 2^n`, capped at
/// `max_delay`. `max_retries` bounds the number of retries after the first
/// attempt, so the total number of attempts is `max_retries + 1`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use turnstile::retry::RetryPolicy;
///
/// let policy = RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(1));
/// assert_eq!(policy.delay_for(0), Duration::from_millis(100));
/// assert_eq!(policy.delay_for(2), Duration::from_millis(400));
/// assert_eq!(policy.delay_for(10), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a retry policy.
    #[must_use]
    pub const fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Returns a policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Returns whether another retry is allowed after `retries_so_far`.
    #[must_use]
    pub const fn allows_retry(&self, retries_so_far: u32) -> bool {
        retries_so_far < self.max_retries
    }

    /// Returns the delay to wait before retry number `retry_index`.
    #[must_use]
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        let factor = 1_u32 << retry_index.min(MAX_BACKOFF_EXPONENT);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Checks that the policy is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RetryPolicyError::InvertedDelays`] when the base delay
    /// exceeds the maximum delay.
    pub fn validate(&self) -> Result<(), RetryPolicyError> {
        if self.base_delay > self.max_delay {
            return Err(RetryPolicyError::InvertedDelays {
                base: self.base_delay,
                max: self.max_delay,
            });
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(200), Duration::from_secs(5))
    }
}

/// Errors returned by [`RetryPolicy::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryPolicyError {
    /// The base delay is larger than the cap.
    #[error("retry base delay {base:?} exceeds max delay {max:?}")]
    InvertedDelays {
        /// Configured base delay.
        base: Duration,
        /// Configured maximum delay.
        max: Duration,
    },
}
