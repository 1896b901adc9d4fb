//! Per-conversation round tracking.

use crate::conversation::{
    domain::{ConversationId, ToolCallId, ToolCallRequest, ToolResult, Turn, TurnDraft},
    ports::{TurnStore, TurnStoreError},
    services::append_with_retry,
};
use crate::correlator::domain::{
    AnomalyKind, CorrelationAnomaly, CorrelatorDomainError, Resolution, RoundId, RoundState,
    ToolRound,
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Most anomalies retained per conversation; older records are dropped.
const ANOMALY_RETENTION: usize = 256;

/// Errors returned by [`TurnCorrelator`].
#[derive(Debug, Clone, Error)]
pub enum CorrelatorError {
    /// The round could not be built.
    #[error(transparent)]
    Domain(#[from] CorrelatorDomainError),

    /// The conversation already has an open round.
    #[error("conversation {conversation_id} already has open round {round_id}")]
    RoundAlreadyOpen {
        /// Conversation with the open round.
        conversation_id: ConversationId,
        /// The open round.
        round_id: RoundId,
    },

    /// Writing aborted tool turns failed.
    #[error(transparent)]
    Store(#[from] TurnStoreError),
}

/// Result type for correlator operations.
pub type CorrelatorResult<T> = Result<T, CorrelatorError>;

#[derive(Debug, Default)]
struct CorrelatorState {
    rounds: HashMap<ConversationId, ToolRound>,
    anomalies: HashMap<ConversationId, Vec<CorrelationAnomaly>>,
}

/// Matches tool results to the requests of the current round.
///
/// Each conversation has at most one open round. Rounds move to
/// `Complete` or `Abandoned` exactly once; results arriving afterwards are
/// recorded as anomalies and never reopen them.
pub struct TurnCorrelator<S, C>
where
    S: TurnStore,
    C: Clock + Send + Sync,
{
    state: Mutex<CorrelatorState>,
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> TurnCorrelator<S, C>
where
    S: TurnStore,
    C: Clock + Send + Sync,
{
    /// Creates a correlator writing aborted turns to `store`.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            state: Mutex::new(CorrelatorState::default()),
            store,
            clock,
        }
    }

    // Every mutation completes under one guard, so a poisoned lock still
    // holds consistent state.
    fn lock(&self) -> MutexGuard<'_, CorrelatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a round for the requests of one assistant turn.
    ///
    /// A terminal round of the same conversation is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelatorError::RoundAlreadyOpen`] while the previous round
    /// is open, and domain errors for empty or malformed request lists.
    pub fn open_round(
        &self,
        conversation_id: ConversationId,
        requests: Vec<ToolCallRequest>,
    ) -> CorrelatorResult<RoundId> {
        let round = ToolRound::open(conversation_id, requests)?;
        let mut state = self.lock();
        if let Some(existing) = state.rounds.get(&conversation_id)
            && existing.state() == RoundState::Open
        {
            return Err(CorrelatorError::RoundAlreadyOpen {
                conversation_id,
                round_id: existing.id(),
            });
        }
        let round_id = round.id();
        info!(
            conversation_id = %conversation_id,
            round_id = %round_id,
            requests = round.requests().len(),
            "tool_round_opened"
        );
        state.rounds.insert(conversation_id, round);
        Ok(round_id)
    }

    /// Records the result for one call of the current round.
    ///
    /// Returns `true` exactly once per round: when this result completes it.
    /// Duplicate, unknown and late results return `false` and are kept as
    /// anomalies.
    #[must_use = "the return value reports whether the round completed"]
    pub fn resolve(
        &self,
        conversation_id: ConversationId,
        call_id: &ToolCallId,
        result: ToolResult,
    ) -> bool {
        let mut state = self.lock();
        let (resolution, round_id) = match state.rounds.get_mut(&conversation_id) {
            Some(round) => (round.resolve(call_id, result), Some(round.id())),
            None => (Resolution::UnknownCall, None),
        };

        let kind = match resolution {
            Resolution::Completed => {
                info!(conversation_id = %conversation_id, call_id = %call_id, "tool_round_completed");
                return true;
            }
            Resolution::Recorded => {
                debug!(conversation_id = %conversation_id, call_id = %call_id, "tool_result_correlated");
                return false;
            }
            Resolution::Duplicate => AnomalyKind::DuplicateResult,
            Resolution::RoundClosed => AnomalyKind::LateResult,
            Resolution::UnknownCall if round_id.is_none() => AnomalyKind::NoRound,
            Resolution::UnknownCall => AnomalyKind::UnknownCall,
        };

        warn!(
            conversation_id = %conversation_id,
            call_id = %call_id,
            anomaly = %kind,
            "tool_result_ignored"
        );
        let log = state.anomalies.entry(conversation_id).or_default();
        if log.len() >= ANOMALY_RETENTION {
            log.remove(0);
        }
        log.push(CorrelationAnomaly {
            kind,
            conversation_id,
            round_id,
            call_id: call_id.clone(),
            observed_at: self.clock.utc(),
        });
        false
    }

    /// Forcibly closes the conversation's round and writes an aborted tool
    /// turn for every request still pending in the log.
    ///
    /// The pending set is read from the store, so calls left open by a
    /// previous process are closed too. Returns the aborted turns in append
    /// order; calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns store errors; turns appended before the failure stay in the
    /// log and a retry finishes the rest.
    pub async fn abandon(
        &self,
        conversation_id: ConversationId,
        reason: &str,
    ) -> CorrelatorResult<Vec<Turn>> {
        let closed = self
            .lock()
            .rounds
            .get_mut(&conversation_id)
            .and_then(|round| round.abandon(reason).map(|unresolved| (round.id(), unresolved)));
        if let Some((round_id, unresolved)) = &closed {
            warn!(
                conversation_id = %conversation_id,
                round_id = %round_id,
                unresolved = unresolved.len(),
                reason,
                "tool_round_abandoned"
            );
        }

        let pending = self.store.pending_tool_calls(conversation_id).await?;
        let mut head = self.store.head(conversation_id).await?;
        let mut aborted = Vec::with_capacity(pending.len());
        for request in pending {
            let draft = TurnDraft::tool(
                conversation_id,
                request.id().clone(),
                ToolResult::aborted(reason),
                &*self.clock,
            );
            let turn = append_with_retry(&*self.store, draft, head).await?;
            head = Some(turn.sequence_number());
            aborted.push(turn);
        }
        Ok(aborted)
    }

    /// Returns the state of the conversation's latest round.
    #[must_use]
    pub fn round_state(&self, conversation_id: ConversationId) -> Option<RoundState> {
        self.lock()
            .rounds
            .get(&conversation_id)
            .map(ToolRound::state)
    }

    /// Returns the anomalies recorded for a conversation, oldest first.
    #[must_use]
    pub fn anomalies(&self, conversation_id: ConversationId) -> Vec<CorrelationAnomaly> {
        self.lock()
            .anomalies
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Drops the conversation's round without writing anything, keeping
    /// its anomalies. Used when the log is about to be reconciled from the
    /// store instead.
    pub fn reset_round(&self, conversation_id: ConversationId) {
        if let Some(round) = self.lock().rounds.remove(&conversation_id) {
            debug!(conversation_id = %conversation_id, round_id = %round.id(), "tool_round_reset");
        }
    }

    /// Drops every record kept for a conversation.
    pub fn forget(&self, conversation_id: ConversationId) {
        let mut state = self.lock();
        state.rounds.remove(&conversation_id);
        state.anomalies.remove(&conversation_id);
    }
}
