//! One tool round and its exactly-once state machine.

use super::CorrelatorDomainError;
use crate::conversation::domain::{
    ConversationId, ToolCallId, ToolCallRequest, ToolErrorKind, ToolResult, TurnId,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a tool round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundId(Uuid);

impl RoundId {
    /// Creates a new random round identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for RoundId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundState {
    /// Waiting for results.
    Open,
    /// Every request was resolved.
    Complete,
    /// Closed before every request was resolved.
    Abandoned,
}

impl RoundState {
    /// Returns the lowercase state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Complete => "complete",
            Self::Abandoned => "abandoned",
        }
    }

    /// Returns `true` for `Complete` and `Abandoned`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Abandoned)
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// What a call to [`ToolRound::resolve`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The result was recorded; others are still outstanding.
    Recorded,
    /// The result was recorded and completed the round.
    Completed,
    /// The call already had a result.
    Duplicate,
    /// The call is not part of this round.
    UnknownCall,
    /// The round was already complete or abandoned.
    RoundClosed,
}

/// The requests emitted by one assistant turn, tracked until each has a
/// result or the round is abandoned.
#[derive(Debug, Clone)]
pub struct ToolRound {
    id: RoundId,
    conversation_id: ConversationId,
    assistant_turn: TurnId,
    requests: Vec<ToolCallRequest>,
    results: HashMap<ToolCallId, ToolResult>,
    state: RoundState,
}

impl ToolRound {
    /// Opens a round over `requests`.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelatorDomainError::EmptyRound`] when there is nothing
    /// to wait for, [`CorrelatorDomainError::MixedTurns`] when the requests
    /// come from different assistant turns, and
    /// [`CorrelatorDomainError::DuplicateCall`] when a call id repeats.
    pub fn open(
        conversation_id: ConversationId,
        requests: Vec<ToolCallRequest>,
    ) -> Result<Self, CorrelatorDomainError> {
        let Some(assistant_turn) = requests.first().map(ToolCallRequest::turn_id) else {
            return Err(CorrelatorDomainError::EmptyRound);
        };
        let mut seen = HashSet::with_capacity(requests.len());
        for request in &requests {
            if request.turn_id() != assistant_turn {
                return Err(CorrelatorDomainError::MixedTurns);
            }
            if !seen.insert(request.id()) {
                return Err(CorrelatorDomainError::DuplicateCall(request.id().clone()));
            }
        }
        Ok(Self {
            id: RoundId::new(),
            conversation_id,
            assistant_turn,
            requests,
            results: HashMap::new(),
            state: RoundState::Open,
        })
    }

    /// Returns the round identifier.
    #[must_use]
    pub const fn id(&self) -> RoundId {
        self.id
    }

    /// Returns the owning conversation.
    #[must_use]
    pub const fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Returns the assistant turn that emitted the requests.
    #[must_use]
    pub const fn assistant_turn(&self) -> TurnId {
        self.assistant_turn
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> RoundState {
        self.state
    }

    /// Returns the requests in emission order.
    #[must_use]
    pub fn requests(&self) -> &[ToolCallRequest] {
        &self.requests
    }

    /// Returns the requests still waiting for a result.
    #[must_use]
    pub fn unresolved(&self) -> Vec<&ToolCallRequest> {
        self.requests
            .iter()
            .filter(|request| !self.results.contains_key(request.id()))
            .collect()
    }

    /// Records the result for one request.
    ///
    /// Only the first result per call counts; the transition to `Complete`
    /// happens once, on the last outstanding result. A second result for an
    /// answered call is a duplicate even after the round closed; a result
    /// for a call the round aborted is late.
    pub fn resolve(&mut self, call_id: &ToolCallId, result: ToolResult) -> Resolution {
        if let Some(recorded) = self.results.get(call_id)
            && recorded.error_kind() != Some(ToolErrorKind::Aborted)
        {
            return Resolution::Duplicate;
        }
        if self.state.is_terminal() {
            return Resolution::RoundClosed;
        }
        if !self.requests.iter().any(|request| request.id() == call_id) {
            return Resolution::UnknownCall;
        }
        self.results.insert(call_id.clone(), result);
        if self.results.len() == self.requests.len() {
            self.state = RoundState::Complete;
            Resolution::Completed
        } else {
            Resolution::Recorded
        }
    }

    /// Moves an open round to `Abandoned`, filling every unresolved request
    /// with an aborted result. Returns the requests that were unresolved, or
    /// `None` when the round was already terminal.
    pub fn abandon(&mut self, reason: &str) -> Option<Vec<ToolCallRequest>> {
        if self.state.is_terminal() {
            return None;
        }
        let unresolved: Vec<ToolCallRequest> =
            self.unresolved().into_iter().cloned().collect();
        for request in &unresolved {
            self.results
                .insert(request.id().clone(), ToolResult::aborted(reason));
        }
        self.state = RoundState::Abandoned;
        Some(unresolved)
    }
}
