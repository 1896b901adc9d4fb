//! Conversation state machine.

use std::fmt;

/// Where a conversation is in its current cycle.
///
/// ```text
/// AwaitingUserInput -> AssistantThinking -> FinalResponse -> AwaitingUserInput
///                           ^      |
///                           |      v
///             ToolRoundComplete <- ToolRoundPending
/// ```
///
/// Any state may fall back to `AwaitingUserInput` when a cycle fails or is
/// cancelled; the log stays valid and the user can resubmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConversationState {
    /// Idle; the next step is a user message.
    #[default]
    AwaitingUserInput,
    /// The model backend is producing the next assistant turn.
    AssistantThinking,
    /// Tool calls of the latest assistant turn are in flight.
    ToolRoundPending,
    /// Every tool call of the round has a result.
    ToolRoundComplete,
    /// The cycle ended with a final assistant turn.
    FinalResponse,
}

impl ConversationState {
    /// Returns the snake case state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingUserInput => "awaiting_user_input",
            Self::AssistantThinking => "assistant_thinking",
            Self::ToolRoundPending => "tool_round_pending",
            Self::ToolRoundComplete => "tool_round_complete",
            Self::FinalResponse => "final_response",
        }
    }

    /// Returns whether the machine may move from `self` to `next`.
    ///
    /// `AwaitingUserInput -> ToolRoundPending` is the recovery path that
    /// re-dispatches calls left pending by a previous process. A pending
    /// round may end in `FinalResponse` when the iteration budget runs out.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::AwaitingUserInput,
                Self::AssistantThinking | Self::ToolRoundPending
            ) | (
                Self::AssistantThinking,
                Self::FinalResponse | Self::ToolRoundPending
            ) | (
                Self::ToolRoundPending,
                Self::ToolRoundComplete | Self::FinalResponse
            ) | (Self::ToolRoundComplete, Self::AssistantThinking)
                | (_, Self::AwaitingUserInput)
        )
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ConversationState::{
        self, AssistantThinking, AwaitingUserInput, FinalResponse, ToolRoundComplete,
        ToolRoundPending,
    };
    use rstest::rstest;

    #[rstest]
    #[case(AwaitingUserInput, AssistantThinking, true)]
    #[case(AssistantThinking, FinalResponse, true)]
    #[case(AssistantThinking, ToolRoundPending, true)]
    #[case(ToolRoundPending, ToolRoundComplete, true)]
    #[case(ToolRoundComplete, AssistantThinking, true)]
    #[case(ToolRoundPending, FinalResponse, true)]
    #[case(FinalResponse, AwaitingUserInput, true)]
    #[case(AwaitingUserInput, FinalResponse, false)]
    #[case(ToolRoundComplete, FinalResponse, false)]
    #[case(FinalResponse, AssistantThinking, false)]
    fn transitions(
        #[case] from: ConversationState,
        #[case] to: ConversationState,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }
}
