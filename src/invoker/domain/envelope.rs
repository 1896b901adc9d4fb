//! Wire contract between the invoker and a tool provider.
//!
//! ```json
//! { "toolName": "get_weather", "arguments": {"city": "Paris"}, "callId": "c1" }
//! { "callId": "c1", "status": "ok", "payload": {"tempC": 18} }
//! ```

use crate::conversation::domain::{ToolCallId, ToolCallRequest, ToolResultStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A call sent to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallEnvelope {
    /// Tool to run.
    pub tool_name: String,
    /// JSON arguments.
    pub arguments: Value,
    /// Correlation identifier echoed by the provider.
    pub call_id: ToolCallId,
}

impl ToolCallEnvelope {
    /// Builds the envelope for an assistant tool call request.
    #[must_use]
    pub fn for_request(request: &ToolCallRequest) -> Self {
        Self {
            tool_name: request.tool_name().to_owned(),
            arguments: request.arguments().clone(),
            call_id: request.id().clone(),
        }
    }
}

/// A provider's answer to one envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    /// Correlation identifier from the envelope.
    pub call_id: ToolCallId,
    /// Whether the tool succeeded.
    pub status: ToolResultStatus,
    /// Result or error payload.
    #[serde(default)]
    pub payload: Value,
}
