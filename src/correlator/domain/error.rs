//! Correlator domain errors.

use crate::conversation::domain::ToolCallId;
use thiserror::Error;

/// Errors raised when opening a round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelatorDomainError {
    /// The round has no requests.
    #[error("a tool round needs at least one request")]
    EmptyRound,

    /// Requests from different assistant turns were mixed.
    #[error("every request in a round must come from the same assistant turn")]
    MixedTurns,

    /// A call id appears twice.
    #[error("tool call {0} appears twice in the round")]
    DuplicateCall(ToolCallId),
}
