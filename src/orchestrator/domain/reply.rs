//! What the model backend returns for one completion.

use crate::conversation::domain::{ConversationId, ToolCallId, TurnDraft};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool call proposed by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedToolCall {
    /// Call identifier minted by the model.
    pub id: ToolCallId,
    /// Tool to run.
    pub tool_name: String,
    /// JSON arguments.
    #[serde(default)]
    pub arguments: Value,
}

/// One model completion: text, optionally with tool calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReply {
    /// Assistant text.
    #[serde(default)]
    pub content: String,
    /// Requested tool calls; empty for a final answer.
    #[serde(default)]
    pub tool_calls: Vec<ProposedToolCall>,
}

impl ModelReply {
    /// A final answer without tool calls.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Adds a tool call.
    #[must_use]
    pub fn with_tool_call(
        mut self,
        id: ToolCallId,
        tool_name: impl Into<String>,
        arguments: Value,
    ) -> Self {
        self.tool_calls.push(ProposedToolCall {
            id,
            tool_name: tool_name.into(),
            arguments,
        });
        self
    }

    /// Returns `true` when the reply ends the cycle.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }

    /// Drafts the assistant turn recording this reply.
    #[must_use]
    pub fn into_draft(self, conversation_id: ConversationId, clock: &impl Clock) -> TurnDraft {
        self.tool_calls.into_iter().fold(
            TurnDraft::assistant(conversation_id, self.content, clock),
            |draft, call| draft.with_tool_call(call.id, call.tool_name, call.arguments),
        )
    }
}
