//! Results that arrived when they should not have.

use super::RoundId;
use crate::conversation::domain::{ConversationId, ToolCallId};
use chrono::{DateTime, Utc};
use std::fmt;

/// Classification of an ignored result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    /// A second result for a call that already had one.
    DuplicateResult,
    /// A result for a call the round never requested.
    UnknownCall,
    /// A result after the round completed or was abandoned.
    LateResult,
    /// A result for a conversation with no round.
    NoRound,
}

impl AnomalyKind {
    /// Returns the snake case name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateResult => "duplicate_result",
            Self::UnknownCall => "unknown_call",
            Self::LateResult => "late_result",
            Self::NoRound => "no_round",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Audit record for an ignored result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationAnomaly {
    /// What went wrong.
    pub kind: AnomalyKind,
    /// Conversation the result was addressed to.
    pub conversation_id: ConversationId,
    /// Round that was current, if any.
    pub round_id: Option<RoundId>,
    /// Call the result claimed to answer.
    pub call_id: ToolCallId,
    /// When the result was observed.
    pub observed_at: DateTime<Utc>,
}
