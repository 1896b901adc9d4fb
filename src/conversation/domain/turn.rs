//! The turn aggregate and its uncommitted draft form.
//!
//! A [`TurnDraft`] is built by the orchestrator, carries the predecessor the
//! writer observed, and becomes an immutable [`Turn`] once a store assigns
//! its sequence number.

use super::{
    ConversationId, Role, SequenceNumber, ToolCallId, ToolCallRequest, ToolResult, TurnDomainError,
    TurnId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// A committed turn in a conversation.
///
/// # Invariants
///
/// - Only assistant turns carry tool call requests.
/// - Only tool turns carry a tool call identifier and a result.
/// - Turns are never modified after commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    id: TurnId,
    conversation_id: ConversationId,
    role: Role,
    content: String,
    tool_calls: Vec<ToolCallRequest>,
    tool_call_id: Option<ToolCallId>,
    result: Option<ToolResult>,
    sequence_number: SequenceNumber,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted turn.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedTurnData {
    /// Persisted turn identifier.
    pub id: TurnId,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Persisted role.
    pub role: Role,
    /// Persisted text content.
    pub content: String,
    /// Persisted tool call requests.
    pub tool_calls: Vec<ToolCallRequest>,
    /// Persisted tool call identifier.
    pub tool_call_id: Option<ToolCallId>,
    /// Persisted tool result.
    pub result: Option<ToolResult>,
    /// Persisted sequence number.
    pub sequence_number: SequenceNumber,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Reconstructs a turn from persistence.
    #[must_use]
    pub fn from_persisted(data: PersistedTurnData) -> Self {
        Self {
            id: data.id,
            conversation_id: data.conversation_id,
            role: data.role,
            content: data.content,
            tool_calls: data.tool_calls,
            tool_call_id: data.tool_call_id,
            result: data.result,
            sequence_number: data.sequence_number,
            created_at: data.created_at,
        }
    }

    /// Returns the turn identifier.
    #[must_use]
    pub const fn id(&self) -> TurnId {
        self.id
    }

    /// Returns the owning conversation.
    #[must_use]
    pub const fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Returns the author role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns the text content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the tool calls requested by an assistant turn.
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        &self.tool_calls
    }

    /// Returns the answered call identifier of a tool turn.
    #[must_use]
    pub const fn tool_call_id(&self) -> Option<&ToolCallId> {
        self.tool_call_id.as_ref()
    }

    /// Returns the structured result of a tool turn.
    #[must_use]
    pub const fn result(&self) -> Option<&ToolResult> {
        self.result.as_ref()
    }

    /// Returns the sequence number.
    #[must_use]
    pub const fn sequence_number(&self) -> SequenceNumber {
        self.sequence_number
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns `true` for an assistant turn that requests no tools.
    #[must_use]
    pub fn is_final_response(&self) -> bool {
        self.role == Role::Assistant && self.tool_calls.is_empty()
    }
}

/// An uncommitted turn.
///
/// # Examples
///
/// ```
/// use mockable::DefaultClock;
/// use serde_json::json;
/// use turnstile::conversation::domain::{ConversationId, ToolCallId, TurnDraft};
///
/// let clock = DefaultClock;
/// let conversation_id = ConversationId::new();
/// let draft = TurnDraft::assistant(conversation_id, "", &clock)
///     .with_tool_call(
///         ToolCallId::new("call-1").expect("valid id"),
///         "get_weather",
///         json!({"city": "Paris"}),
///     );
/// assert_eq!(draft.tool_calls().len(), 1);
/// assert!(draft.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TurnDraft {
    id: TurnId,
    conversation_id: ConversationId,
    role: Role,
    content: String,
    tool_calls: Vec<ToolCallRequest>,
    tool_call_id: Option<ToolCallId>,
    result: Option<ToolResult>,
    predecessor: Option<SequenceNumber>,
    created_at: DateTime<Utc>,
}

impl TurnDraft {
    fn base(
        conversation_id: ConversationId,
        role: Role,
        content: String,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: TurnId::new(),
            conversation_id,
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            result: None,
            predecessor: None,
            created_at: clock.utc(),
        }
    }

    /// Drafts a user turn.
    ///
    /// # Errors
    ///
    /// Returns [`TurnDomainError::EmptyContent`] when the text is blank.
    pub fn user(
        conversation_id: ConversationId,
        content: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<Self, TurnDomainError> {
        let text = content.into();
        if text.trim().is_empty() {
            return Err(TurnDomainError::EmptyContent);
        }
        Ok(Self::base(conversation_id, Role::User, text, clock))
    }

    /// Drafts an assistant turn without tool calls.
    #[must_use]
    pub fn assistant(
        conversation_id: ConversationId,
        content: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        Self::base(conversation_id, Role::Assistant, content.into(), clock)
    }

    /// Drafts a tool turn answering `tool_call_id`.
    #[must_use]
    pub fn tool(
        conversation_id: ConversationId,
        tool_call_id: ToolCallId,
        result: ToolResult,
        clock: &impl Clock,
    ) -> Self {
        let mut draft = Self::base(conversation_id, Role::Tool, result.render(), clock);
        draft.tool_call_id = Some(tool_call_id);
        draft.result = Some(result);
        draft
    }

    /// Adds a tool call request emitted by this assistant draft.
    #[must_use]
    pub fn with_tool_call(
        mut self,
        id: ToolCallId,
        tool_name: impl Into<String>,
        arguments: Value,
    ) -> Self {
        let request = ToolCallRequest::new(id, tool_name, arguments, self.id);
        self.tool_calls.push(request);
        self
    }

    /// Declares the head sequence number this draft expects to follow.
    #[must_use]
    pub const fn after(mut self, predecessor: Option<SequenceNumber>) -> Self {
        self.predecessor = predecessor;
        self
    }

    /// Returns the pre-assigned turn identifier.
    #[must_use]
    pub const fn id(&self) -> TurnId {
        self.id
    }

    /// Returns the target conversation.
    #[must_use]
    pub const fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Returns the author role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns the drafted tool calls.
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        &self.tool_calls
    }

    /// Returns the answered call identifier of a tool draft.
    #[must_use]
    pub const fn tool_call_id(&self) -> Option<&ToolCallId> {
        self.tool_call_id.as_ref()
    }

    /// Returns the declared predecessor.
    #[must_use]
    pub const fn predecessor(&self) -> Option<SequenceNumber> {
        self.predecessor
    }

    /// Checks structural invariants that builders cannot enforce alone.
    ///
    /// # Errors
    ///
    /// Returns [`TurnDomainError`] when a tool call has no name or a call
    /// identifier repeats within the draft.
    pub fn validate(&self) -> Result<(), TurnDomainError> {
        let mut seen = HashSet::with_capacity(self.tool_calls.len());
        for request in &self.tool_calls {
            if request.tool_name().is_empty() {
                return Err(TurnDomainError::EmptyToolName(request.id().clone()));
            }
            if !seen.insert(request.id()) {
                return Err(TurnDomainError::DuplicateToolCallInTurn(
                    request.id().clone(),
                ));
            }
        }
        Ok(())
    }

    /// Commits the draft at the sequence number assigned by a store.
    #[must_use]
    pub fn commit(self, sequence_number: SequenceNumber) -> Turn {
        Turn {
            id: self.id,
            conversation_id: self.conversation_id,
            role: self.role,
            content: self.content,
            tool_calls: self.tool_calls,
            tool_call_id: self.tool_call_id,
            result: self.result,
            sequence_number,
            created_at: self.created_at,
        }
    }
}

/// Inclusive range of sequence numbers to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnRange {
    from: SequenceNumber,
    to: Option<SequenceNumber>,
}

impl TurnRange {
    /// Every turn of a conversation.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            from: SequenceNumber::FIRST,
            to: None,
        }
    }

    /// Every turn starting at `from`.
    #[must_use]
    pub const fn starting_at(from: SequenceNumber) -> Self {
        Self { from, to: None }
    }

    /// Turns from `from` to `to`, both inclusive.
    #[must_use]
    pub const fn between(from: SequenceNumber, to: SequenceNumber) -> Self {
        Self { from, to: Some(to) }
    }

    /// The last `count` turns of a log whose head is `head`.
    #[must_use]
    pub const fn last(count: u64, head: SequenceNumber) -> Self {
        let start = head.value().saturating_sub(count).saturating_add(1);
        Self::between(SequenceNumber::new(start), head)
    }

    /// Returns the first sequence number in range.
    #[must_use]
    pub const fn start(&self) -> SequenceNumber {
        self.from
    }

    /// Returns the inclusive upper bound, if any.
    #[must_use]
    pub const fn end(&self) -> Option<SequenceNumber> {
        self.to
    }
}

impl Default for TurnRange {
    fn default() -> Self {
        Self::all()
    }
}
