//! Transient state of one in-flight tool call.

use super::InvocationOutcome;
use crate::conversation::domain::ToolCallId;
use crate::tool_registry::domain::ProviderId;
use std::fmt;
use tokio::time::Instant;

/// Lifecycle of a [`ToolInvocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationState {
    /// Sent or about to be sent.
    Pending,
    /// The provider returned a result.
    Succeeded,
    /// The call failed.
    Failed,
    /// The deadline passed or the call was cancelled.
    TimedOut,
}

impl InvocationState {
    /// Returns the lowercase state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }

    /// Returns `true` once the invocation can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Book-keeping for one call: where it went, how often it was retried, and
/// when it must finish.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    call_id: ToolCallId,
    provider_id: ProviderId,
    state: InvocationState,
    deadline: Instant,
    retry_count: u32,
}

impl ToolInvocation {
    /// Starts tracking a pending call.
    #[must_use]
    pub const fn new(call_id: ToolCallId, provider_id: ProviderId, deadline: Instant) -> Self {
        Self {
            call_id,
            provider_id,
            state: InvocationState::Pending,
            deadline,
            retry_count: 0,
        }
    }

    /// Returns the call identifier.
    #[must_use]
    pub const fn call_id(&self) -> &ToolCallId {
        &self.call_id
    }

    /// Returns the provider currently serving the call.
    #[must_use]
    pub const fn provider_id(&self) -> ProviderId {
        self.provider_id
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> InvocationState {
        self.state
    }

    /// Returns the deadline.
    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Returns how many retries were started.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Records a retry against a (re-validated) provider.
    pub const fn record_retry(&mut self, provider_id: ProviderId) {
        self.provider_id = provider_id;
        self.retry_count = self.retry_count.saturating_add(1);
    }

    /// Moves to the terminal state matching `outcome` and returns it.
    ///
    /// A finished invocation keeps its first terminal state.
    pub fn finish(&mut self, outcome: InvocationOutcome) -> InvocationOutcome {
        if !self.state.is_terminal() {
            self.state = match &outcome {
                InvocationOutcome::Succeeded { .. } => InvocationState::Succeeded,
                InvocationOutcome::Failed { .. } => InvocationState::Failed,
                InvocationOutcome::TimedOut => InvocationState::TimedOut,
            };
        }
        outcome
    }
}
