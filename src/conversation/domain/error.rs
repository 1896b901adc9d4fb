//! Error types for conversation domain validation and parsing.

use super::ToolCallId;
use thiserror::Error;

/// Errors returned while constructing conversation domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TurnDomainError {
    /// User turns must carry non-empty text.
    #[error("user turn content must not be empty")]
    EmptyContent,

    /// A tool call identifier is empty after trimming.
    #[error("tool call identifier must not be empty")]
    EmptyToolCallId,

    /// A tool call identifier does not fit the log's column.
    #[error("tool call identifier is {length} bytes long, the limit is {max}")]
    ToolCallIdTooLong {
        /// Length of the rejected identifier in bytes.
        length: usize,
        /// Longest accepted identifier in bytes.
        max: usize,
    },

    /// A tool call names no tool.
    #[error("tool call {0} has an empty tool name")]
    EmptyToolName(ToolCallId),

    /// The same tool call identifier appears twice within one turn.
    #[error("tool call {0} appears more than once in the same turn")]
    DuplicateToolCallInTurn(ToolCallId),

    /// A conversation title is empty after trimming.
    #[error("conversation title must not be empty")]
    EmptyTitle,
}

/// Error returned while parsing a role from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown turn role: {0}")]
pub struct ParseRoleError(pub String);
