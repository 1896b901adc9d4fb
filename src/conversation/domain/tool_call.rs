//! Tool call requests and structured tool results.
//!
//! Tool results serialise in camelCase so that the stored payload matches
//! the tool wire contract:
//!
//! ```json
//! { "status": "error", "payload": "deadline exceeded", "errorKind": "ToolTimeoutError" }
//! ```

use super::{ToolCallId, TurnId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An assistant-emitted instruction to invoke a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    id: ToolCallId,
    tool_name: String,
    arguments: Value,
    turn_id: TurnId,
}

impl ToolCallRequest {
    /// Creates a request emitted by the assistant turn `turn_id`.
    #[must_use]
    pub fn new(
        id: ToolCallId,
        tool_name: impl Into<String>,
        arguments: Value,
        turn_id: TurnId,
    ) -> Self {
        Self {
            id,
            tool_name: tool_name.into().trim().to_owned(),
            arguments,
            turn_id,
        }
    }

    /// Returns the call identifier.
    #[must_use]
    pub const fn id(&self) -> &ToolCallId {
        &self.id
    }

    /// Returns the requested tool name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Returns the JSON arguments.
    #[must_use]
    pub const fn arguments(&self) -> &Value {
        &self.arguments
    }

    /// Returns the assistant turn that emitted this request.
    #[must_use]
    pub const fn turn_id(&self) -> TurnId {
        self.turn_id
    }
}

/// Terminal status of a tool result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolResultStatus {
    /// The tool produced a payload.
    Ok,
    /// The call failed; see the error kind.
    Error,
}

/// Classification of a failed tool call, recorded in the tool turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolErrorKind {
    /// The provider did not answer before the deadline, or the call was
    /// cancelled.
    #[serde(rename = "ToolTimeoutError")]
    Timeout,
    /// The provider reported a failure or the transport broke.
    #[serde(rename = "ToolExecutionError")]
    Execution,
    /// No registered provider offers the tool.
    #[serde(rename = "UnknownToolError")]
    UnknownTool,
    /// More than one registered provider offers the tool.
    #[serde(rename = "AmbiguousToolError")]
    AmbiguousTool,
    /// The provider is deregistered or marked unreachable.
    #[serde(rename = "ProviderUnavailableError")]
    ProviderUnavailable,
    /// The round was abandoned before the call produced a result.
    #[serde(rename = "Aborted")]
    Aborted,
}

impl ToolErrorKind {
    /// Returns the canonical taxonomy name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "ToolTimeoutError",
            Self::Execution => "ToolExecutionError",
            Self::UnknownTool => "UnknownToolError",
            Self::AmbiguousTool => "AmbiguousToolError",
            Self::ProviderUnavailable => "ProviderUnavailableError",
            Self::Aborted => "Aborted",
        }
    }
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Structured result carried by a tool turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    status: ToolResultStatus,
    payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_kind: Option<ToolErrorKind>,
}

impl ToolResult {
    /// Creates a successful result.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use turnstile::conversation::domain::{ToolResult, ToolResultStatus};
    ///
    /// let result = ToolResult::ok(json!({"tempC": 18}));
    /// assert_eq!(result.status(), ToolResultStatus::Ok);
    /// ```
    #[must_use]
    pub const fn ok(payload: Value) -> Self {
        Self {
            status: ToolResultStatus::Ok,
            payload,
            error_kind: None,
        }
    }

    /// Creates a failed result with a human-readable detail.
    #[must_use]
    pub fn error(kind: ToolErrorKind, detail: impl Into<String>) -> Self {
        Self {
            status: ToolResultStatus::Error,
            payload: Value::String(detail.into()),
            error_kind: Some(kind),
        }
    }

    /// Creates the result recorded for a call abandoned with its round.
    #[must_use]
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::error(ToolErrorKind::Aborted, reason)
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> ToolResultStatus {
        self.status
    }

    /// Returns the payload.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns the error kind for failed results.
    #[must_use]
    pub const fn error_kind(&self) -> Option<ToolErrorKind> {
        self.error_kind
    }

    /// Returns `true` when the status is `ok`.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, ToolResultStatus::Ok)
    }

    /// Renders the result as the textual content of a tool turn.
    #[must_use]
    pub fn render(&self) -> String {
        let detail = match &self.payload {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        match self.error_kind {
            Some(kind) => format!("{kind}: {detail}"),
            None => detail,
        }
    }
}
