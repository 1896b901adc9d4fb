//! Terminal outcome of one tool invocation.

use crate::conversation::domain::{ToolErrorKind, ToolResult};
use serde_json::Value;

/// What an invocation produced.
///
/// Every outcome, including failures, becomes a tool turn; none of them
/// aborts the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    /// The provider returned a result.
    Succeeded {
        /// Result payload.
        result: Value,
    },
    /// The call failed before or during execution.
    Failed {
        /// Failure classification.
        error_kind: ToolErrorKind,
        /// Human-readable detail.
        detail: String,
    },
    /// The deadline passed or the call was cancelled.
    TimedOut,
}

impl InvocationOutcome {
    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(error_kind: ToolErrorKind, detail: impl Into<String>) -> Self {
        Self::Failed {
            error_kind,
            detail: detail.into(),
        }
    }

    /// Returns `true` for successful outcomes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Returns the failure classification, if any.
    #[must_use]
    pub const fn error_kind(&self) -> Option<ToolErrorKind> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { error_kind, .. } => Some(*error_kind),
            Self::TimedOut => Some(ToolErrorKind::Timeout),
        }
    }

    /// Converts the outcome into the result stored in a tool turn.
    #[must_use]
    pub fn into_tool_result(self) -> ToolResult {
        match self {
            Self::Succeeded { result } => ToolResult::ok(result),
            Self::Failed { error_kind, detail } => ToolResult::error(error_kind, detail),
            Self::TimedOut => ToolResult::error(
                ToolErrorKind::Timeout,
                "the tool did not respond before its deadline",
            ),
        }
    }
}
