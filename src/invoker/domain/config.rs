//! Invoker configuration.

use crate::retry::{RetryPolicy, RetryPolicyError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default per-call deadline.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for [`ToolInvoker`](crate::invoker::services::ToolInvoker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvokerConfig {
    /// Deadline applied when the caller does not pass one.
    pub default_timeout: Duration,
    /// Retry schedule for idempotent tools after transport failures.
    pub retry: RetryPolicy,
}

impl InvokerConfig {
    /// Sets the default deadline.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the retry schedule.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`InvokerConfigError`] for a zero timeout or an inconsistent
    /// retry policy.
    pub fn validate(&self) -> Result<(), InvokerConfigError> {
        if self.default_timeout.is_zero() {
            return Err(InvokerConfigError::ZeroTimeout);
        }
        self.retry.validate()?;
        Ok(())
    }
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TOOL_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Invalid invoker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokerConfigError {
    /// Calls would time out immediately.
    #[error("tool timeout must be greater than zero")]
    ZeroTimeout,

    /// The retry policy is inconsistent.
    #[error(transparent)]
    Retry(#[from] RetryPolicyError),
}
