//! Domain types for conversations and their turn log.
//!
//! Pure types with no infrastructure dependencies. Turns are immutable once
//! committed and serialisable via serde.

mod conversation;
mod error;
mod ids;
mod ledger;
mod role;
mod tool_call;
mod turn;

pub use conversation::{Conversation, PersistedConversationData};
pub use error::{ParseRoleError, TurnDomainError};
pub use ids::{
    ConversationId, MAX_TOOL_CALL_ID_LENGTH, SequenceNumber, ToolCallId, TurnId, UserId,
};
pub use ledger::{LedgerViolation, ToolCallLedger};
pub use role::Role;
pub use tool_call::{ToolCallRequest, ToolErrorKind, ToolResult, ToolResultStatus};
pub use turn::{PersistedTurnData, Turn, TurnDraft, TurnRange};
