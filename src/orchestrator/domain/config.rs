//! Orchestrator configuration.

use crate::invoker::domain::DEFAULT_TOOL_TIMEOUT;
use crate::retry::{RetryPolicy, RetryPolicyError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// What [`recover`](crate::orchestrator::services::ConversationOrchestrator::recover)
/// does with tool calls left pending by a previous process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Run the pending calls again and continue the cycle.
    Redispatch,
    /// Close the pending calls with aborted results.
    #[default]
    Abandon,
}

/// Settings for the conversation orchestrator.
///
/// # Examples
///
/// ```
/// use turnstile::orchestrator::domain::OrchestratorConfig;
///
/// let config = OrchestratorConfig::default().with_iteration_budget(2);
/// assert_eq!(config.iteration_budget, 2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Most tool rounds per user message.
    pub iteration_budget: u32,
    /// Most turns sent to the model backend.
    pub history_limit: u64,
    /// Deadline for each tool call.
    pub tool_timeout: Duration,
    /// Backoff for unavailable model backends.
    pub model_retry: RetryPolicy,
    /// Handling of rounds interrupted by a crash.
    pub recovery: RecoveryPolicy,
}

impl OrchestratorConfig {
    /// Sets the iteration budget.
    #[must_use]
    pub const fn with_iteration_budget(mut self, budget: u32) -> Self {
        self.iteration_budget = budget;
        self
    }

    /// Sets the history window.
    #[must_use]
    pub const fn with_history_limit(mut self, limit: u64) -> Self {
        self.history_limit = limit;
        self
    }

    /// Sets the per-call tool deadline.
    #[must_use]
    pub const fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Sets the model retry schedule.
    #[must_use]
    pub const fn with_model_retry(mut self, retry: RetryPolicy) -> Self {
        self.model_retry = retry;
        self
    }

    /// Sets the recovery policy.
    #[must_use]
    pub const fn with_recovery(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = recovery;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorConfigError`] for zero budgets, windows or
    /// deadlines and for inconsistent retry policies.
    pub fn validate(&self) -> Result<(), OrchestratorConfigError> {
        if self.iteration_budget == 0 {
            return Err(OrchestratorConfigError::ZeroIterationBudget);
        }
        if self.history_limit == 0 {
            return Err(OrchestratorConfigError::ZeroHistoryLimit);
        }
        if self.tool_timeout.is_zero() {
            return Err(OrchestratorConfigError::ZeroToolTimeout);
        }
        self.model_retry.validate()?;
        Ok(())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            iteration_budget: 8,
            history_limit: 50,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            model_retry: RetryPolicy::default(),
            recovery: RecoveryPolicy::default(),
        }
    }
}

/// Invalid orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorConfigError {
    /// No tool round could ever run.
    #[error("iteration budget must be at least 1")]
    ZeroIterationBudget,

    /// The model would see no history.
    #[error("history limit must be at least 1")]
    ZeroHistoryLimit,

    /// Tool calls would time out immediately.
    #[error("tool timeout must be greater than zero")]
    ZeroToolTimeout,

    /// The model retry policy is inconsistent.
    #[error(transparent)]
    Retry(#[from] RetryPolicyError),
}
