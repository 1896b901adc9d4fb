//! Turn store port: the append-only, strictly ordered conversation log.

use super::TurnCursor;
use crate::conversation::domain::{
    ConversationId, LedgerViolation, SequenceNumber, ToolCallId, ToolCallRequest, Turn, TurnDraft,
    TurnDomainError, TurnRange,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for turn store operations.
pub type TurnStoreResult<T> = Result<T, TurnStoreError>;

/// Number of turns a cursor fetches per page by default.
pub const DEFAULT_PAGE_SIZE: usize = 64;

/// Persistence contract for the turn log.
///
/// # Implementation Notes
///
/// Implementations must ensure:
/// - Sequence numbers are assigned atomically per conversation, start at 1
///   and have no gaps
/// - An append whose declared predecessor differs from the current head
///   fails with [`TurnStoreError::Conflict`] and stores nothing
/// - Tool call invariants enforced by
///   [`ToolCallLedger`](crate::conversation::domain::ToolCallLedger) hold
/// - Turns are never updated after commit
#[async_trait]
pub trait TurnStore: Send + Sync {
    /// Commits a draft after its declared predecessor.
    ///
    /// # Errors
    ///
    /// Returns [`TurnStoreError::Conflict`] when the head moved,
    /// [`TurnStoreError::InvalidTurn`] or [`TurnStoreError::Ledger`] when the
    /// draft breaks log invariants, and persistence errors otherwise.
    async fn append(&self, draft: TurnDraft) -> TurnStoreResult<Turn>;

    /// Returns the sequence number of the latest turn, if any.
    async fn head(&self, conversation_id: ConversationId)
    -> TurnStoreResult<Option<SequenceNumber>>;

    /// Returns up to `limit` turns starting at `from`, in sequence order.
    async fn read_page(
        &self,
        conversation_id: ConversationId,
        from: SequenceNumber,
        limit: usize,
    ) -> TurnStoreResult<Vec<Turn>>;

    /// Finds a requested tool call that has no result yet.
    ///
    /// Returns `None` when the call was never requested or is answered.
    async fn find_pending_tool_call(
        &self,
        conversation_id: ConversationId,
        tool_call_id: &ToolCallId,
    ) -> TurnStoreResult<Option<ToolCallRequest>>;

    /// Returns every unanswered tool call in emission order.
    async fn pending_tool_calls(
        &self,
        conversation_id: ConversationId,
    ) -> TurnStoreResult<Vec<ToolCallRequest>>;

    /// Removes every turn of a conversation.
    async fn delete_conversation(&self, conversation_id: ConversationId) -> TurnStoreResult<()>;

    /// Returns a lazy, restartable cursor over `range`.
    fn read_range(&self, conversation_id: ConversationId, range: TurnRange) -> TurnCursor<'_, Self>
    where
        Self: Sized,
    {
        TurnCursor::new(self, conversation_id, range, DEFAULT_PAGE_SIZE)
    }
}

/// Errors returned by turn store implementations.
#[derive(Debug, Clone, Error)]
pub enum TurnStoreError {
    /// The declared predecessor does not match the current head.
    #[error(
        "append conflict in conversation {conversation_id}: expected head {expected:?}, found {actual:?}"
    )]
    Conflict {
        /// Conversation whose head moved.
        conversation_id: ConversationId,
        /// Head declared by the writer.
        expected: Option<SequenceNumber>,
        /// Head found in the store.
        actual: Option<SequenceNumber>,
    },

    /// The draft failed domain validation.
    #[error(transparent)]
    InvalidTurn(#[from] TurnDomainError),

    /// The draft breaks tool call invariants.
    #[error(transparent)]
    Ledger(#[from] LedgerViolation),

    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted turn data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("turn persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TurnStoreError {
    /// Wraps persisted-data decoding failures.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Returns `true` for optimistic-concurrency conflicts.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
