//! Per-conversation index of tool call requests and their answers.
//!
//! Store adapters keep one ledger per conversation (or rebuild it from
//! persisted turns) to enforce the log invariants at append time: call ids
//! are unique within a conversation and every tool turn answers exactly one
//! earlier, still-pending request.

use super::{Role, ToolCallId, ToolCallRequest, Turn, TurnDraft};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// A draft that would break the tool call invariants of the log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerViolation {
    /// The call id was already used by an earlier assistant turn.
    #[error("tool call id {0} is already used in this conversation")]
    DuplicateToolCallId(ToolCallId),

    /// A tool turn answers a call id that was never requested.
    #[error("tool result {0} does not match any requested tool call")]
    UnmatchedToolResult(ToolCallId),

    /// A tool turn answers a call that already has a result.
    #[error("tool call {0} already has a result")]
    DuplicateToolResult(ToolCallId),

    /// The draft role does not match the payload it carries.
    #[error("{0} turns cannot carry this payload")]
    MisplacedPayload(Role),
}

/// Index of requested and answered tool calls for one conversation.
#[derive(Debug, Clone, Default)]
pub struct ToolCallLedger {
    requests: Vec<ToolCallRequest>,
    positions: HashMap<ToolCallId, usize>,
    answered: HashSet<ToolCallId>,
}

impl ToolCallLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from committed turns in sequence order.
    #[must_use]
    pub fn from_turns<'a>(turns: impl IntoIterator<Item = &'a Turn>) -> Self {
        let mut ledger = Self::new();
        for turn in turns {
            ledger.record(turn);
        }
        ledger
    }

    /// Checks whether `draft` may be appended.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerViolation`] describing the broken invariant.
    pub fn check(&self, draft: &TurnDraft) -> Result<(), LedgerViolation> {
        let role = draft.role();
        if role != Role::Assistant && !draft.tool_calls().is_empty() {
            return Err(LedgerViolation::MisplacedPayload(role));
        }

        match (role, draft.tool_call_id()) {
            (Role::Tool, Some(call_id)) => {
                if !self.positions.contains_key(call_id) {
                    return Err(LedgerViolation::UnmatchedToolResult(call_id.clone()));
                }
                if self.answered.contains(call_id) {
                    return Err(LedgerViolation::DuplicateToolResult(call_id.clone()));
                }
                Ok(())
            }
            (Role::Tool, None) | (Role::User | Role::Assistant, Some(_)) => {
                Err(LedgerViolation::MisplacedPayload(role))
            }
            (Role::Assistant, None) => draft
                .tool_calls()
                .iter()
                .find(|request| self.positions.contains_key(request.id()))
                .map_or(Ok(()), |request| {
                    Err(LedgerViolation::DuplicateToolCallId(request.id().clone()))
                }),
            (Role::User, None) => Ok(()),
        }
    }

    /// Records a committed turn.
    pub fn record(&mut self, turn: &Turn) {
        for request in turn.tool_calls() {
            self.positions
                .insert(request.id().clone(), self.requests.len());
            self.requests.push(request.clone());
        }
        if let Some(call_id) = turn.tool_call_id() {
            self.answered.insert(call_id.clone());
        }
    }

    /// Returns the request with `call_id` if it has no result yet.
    #[must_use]
    pub fn find_pending(&self, call_id: &ToolCallId) -> Option<&ToolCallRequest> {
        if self.answered.contains(call_id) {
            return None;
        }
        self.positions
            .get(call_id)
            .and_then(|position| self.requests.get(*position))
    }

    /// Returns every unanswered request in emission order.
    #[must_use]
    pub fn pending(&self) -> Vec<ToolCallRequest> {
        self.requests
            .iter()
            .filter(|request| !self.answered.contains(request.id()))
            .cloned()
            .collect()
    }
}
