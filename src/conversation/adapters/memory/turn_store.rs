//! In-memory turn store for tests and single-process embedding.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::conversation::{
    domain::{
        ConversationId, SequenceNumber, ToolCallId, ToolCallLedger, ToolCallRequest, Turn,
        TurnDraft,
    },
    ports::{TurnStore, TurnStoreError, TurnStoreResult},
};

/// Thread-safe in-memory turn store.
///
/// Appends are serialised per store by a single write lock, which makes the
/// head comparison and sequence assignment atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTurnStore {
    state: Arc<RwLock<HashMap<ConversationId, ConversationLog>>>,
}

#[derive(Debug, Default)]
struct ConversationLog {
    turns: Vec<Turn>,
    ledger: ToolCallLedger,
}

impl ConversationLog {
    fn head(&self) -> Option<SequenceNumber> {
        self.turns.last().map(Turn::sequence_number)
    }
}

impl InMemoryTurnStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl ToString) -> TurnStoreError {
    TurnStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TurnStore for InMemoryTurnStore {
    async fn append(&self, draft: TurnDraft) -> TurnStoreResult<Turn> {
        let mut state = self.state.write().map_err(poisoned)?;
        let conversation_id = draft.conversation_id();
        let log = state.entry(conversation_id).or_default();

        let actual = log.head();
        if draft.predecessor() != actual {
            return Err(TurnStoreError::Conflict {
                conversation_id,
                expected: draft.predecessor(),
                actual,
            });
        }
        draft.validate()?;
        log.ledger.check(&draft)?;

        let turn = draft.commit(SequenceNumber::after(actual));
        log.ledger.record(&turn);
        log.turns.push(turn.clone());
        Ok(turn)
    }

    async fn head(
        &self,
        conversation_id: ConversationId,
    ) -> TurnStoreResult<Option<SequenceNumber>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.get(&conversation_id).and_then(ConversationLog::head))
    }

    async fn read_page(
        &self,
        conversation_id: ConversationId,
        from: SequenceNumber,
        limit: usize,
    ) -> TurnStoreResult<Vec<Turn>> {
        let state = self.state.read().map_err(poisoned)?;
        let Some(log) = state.get(&conversation_id) else {
            return Ok(Vec::new());
        };
        Ok(log
            .turns
            .iter()
            .skip_while(|turn| turn.sequence_number() < from)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_pending_tool_call(
        &self,
        conversation_id: ConversationId,
        tool_call_id: &ToolCallId,
    ) -> TurnStoreResult<Option<ToolCallRequest>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .get(&conversation_id)
            .and_then(|log| log.ledger.find_pending(tool_call_id))
            .cloned())
    }

    async fn pending_tool_calls(
        &self,
        conversation_id: ConversationId,
    ) -> TurnStoreResult<Vec<ToolCallRequest>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .get(&conversation_id)
            .map(|log| log.ledger.pending())
            .unwrap_or_default())
    }

    async fn delete_conversation(&self, conversation_id: ConversationId) -> TurnStoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.remove(&conversation_id);
        Ok(())
    }
}
