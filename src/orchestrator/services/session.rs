//! Per-conversation cycle state.

use crate::conversation::domain::ConversationId;
use crate::orchestrator::domain::ConversationState;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Status {
    state: ConversationState,
    cancel: Option<CancellationToken>,
}

/// Serialises cycles of one conversation and exposes their progress.
#[derive(Debug, Default)]
pub(super) struct Session {
    /// Held for the whole cycle.
    pub(super) gate: tokio::sync::Mutex<()>,
    status: Mutex<Status>,
}

impl Session {
    fn status(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn state(&self) -> ConversationState {
        self.status().state
    }

    /// Starts a cycle and returns its cancellation token.
    pub(super) fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        self.status().cancel = Some(token.clone());
        token
    }

    /// Ends the cycle and returns to `AwaitingUserInput`.
    pub(super) fn end(&self, conversation_id: ConversationId) {
        let mut status = self.status();
        status.cancel = None;
        status.state = ConversationState::AwaitingUserInput;
        debug!(conversation_id = %conversation_id, "conversation_cycle_ended");
    }

    pub(super) fn transition(&self, conversation_id: ConversationId, next: ConversationState) {
        let mut status = self.status();
        if status.state.can_transition_to(next) {
            debug!(
                conversation_id = %conversation_id,
                from = %status.state,
                to = %next,
                "conversation_state_changed"
            );
            status.state = next;
        } else {
            warn!(
                conversation_id = %conversation_id,
                from = %status.state,
                to = %next,
                "conversation_state_transition_rejected"
            );
        }
    }

    /// Cancels the running cycle. Returns `false` when none is running.
    pub(super) fn cancel(&self) -> bool {
        self.status().cancel.take().is_some_and(|token| {
            token.cancel();
            true
        })
    }
}
