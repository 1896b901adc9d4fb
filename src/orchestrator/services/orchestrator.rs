//! The conversation loop.

use super::{
    error::{OrchestratorError, OrchestratorResult},
    session::Session,
};
use crate::conversation::{
    domain::{
        Conversation, ConversationId, Role, SequenceNumber, ToolCallRequest, ToolErrorKind, Turn,
        TurnDraft, TurnRange, UserId,
    },
    ports::{ConversationMetadataStore, TurnCursor, TurnStore, TurnStoreError},
    services::append_with_retry,
};
use crate::correlator::{domain::RoundState, services::TurnCorrelator};
use crate::invoker::{
    domain::InvocationOutcome, ports::ToolTransport, services::ToolInvoker,
};
use crate::orchestrator::{
    domain::{
        ConversationState, ModelReply, OrchestratorConfig, OrchestratorConfigError,
        RecoveryPolicy,
    },
    ports::ModelBackend,
};
use crate::tool_registry::ports::ToolResolver;
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const BUDGET_REASON: &str = "iteration budget exhausted";
const CANCELLED_REASON: &str = "round cancelled";
const SUPERSEDED_REASON: &str = "superseded by a new user message";
const RECOVERY_REASON: &str = "round interrupted before completion";
const TASK_FAILED_REASON: &str = "tool task ended without a result";
const STORE_FAILED_REASON: &str = "tool result could not be recorded";

/// What [`ConversationOrchestrator::recover`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryReport {
    /// Nothing was pending.
    Clean,
    /// Pending calls were closed with aborted results.
    Abandoned {
        /// The aborted tool turns, in append order.
        aborted: Vec<Turn>,
    },
    /// Pending calls were run again and the cycle finished.
    Redispatched {
        /// The final assistant turn.
        reply: Turn,
    },
}

/// Drives conversations from a user message to a final assistant turn.
///
/// Cycles of one conversation are serialised; different conversations run
/// in parallel. Within a tool round every call runs as its own task, and
/// results are appended in completion order.
pub struct ConversationOrchestrator<S, M, B, T, R, C>
where
    S: TurnStore + 'static,
    M: ConversationMetadataStore,
    B: ModelBackend,
    T: ToolTransport + 'static,
    R: ToolResolver + 'static,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    metadata: Arc<M>,
    model: Arc<B>,
    invoker: Arc<ToolInvoker<T, R>>,
    correlator: TurnCorrelator<S, C>,
    clock: Arc<C>,
    config: OrchestratorConfig,
    sessions: Mutex<HashMap<ConversationId, Arc<Session>>>,
}

impl<S, M, B, T, R, C> ConversationOrchestrator<S, M, B, T, R, C>
where
    S: TurnStore + 'static,
    M: ConversationMetadataStore,
    B: ModelBackend,
    T: ToolTransport + 'static,
    R: ToolResolver + 'static,
    C: Clock + Send + Sync,
{
    /// Creates an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorConfigError`] when `config` is invalid.
    pub fn new(
        store: Arc<S>,
        metadata: Arc<M>,
        model: Arc<B>,
        invoker: Arc<ToolInvoker<T, R>>,
        clock: Arc<C>,
        config: OrchestratorConfig,
    ) -> Result<Self, OrchestratorConfigError> {
        config.validate()?;
        Ok(Self {
            correlator: TurnCorrelator::new(Arc::clone(&store), Arc::clone(&clock)),
            store,
            metadata,
            model,
            invoker,
            clock,
            config,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Returns the round correlator, for inspecting rounds and anomalies.
    #[must_use]
    pub const fn correlator(&self) -> &TurnCorrelator<S, C> {
        &self.correlator
    }

    fn session(&self, conversation_id: ConversationId) -> Arc<Session> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(sessions.entry(conversation_id).or_default())
    }

    /// Creates a conversation titled after `text` and submits `text` as its
    /// first message.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidInput`] for a blank message,
    /// metadata errors, and any error of
    /// [`submit_user_message`](Self::submit_user_message).
    pub async fn start_conversation(
        &self,
        owner: UserId,
        text: &str,
    ) -> OrchestratorResult<(Conversation, Turn)> {
        let conversation = Conversation::new(
            owner,
            Conversation::title_from_message(text),
            &*self.clock,
        )?;
        self.metadata.create(&conversation).await?;
        info!(
            conversation_id = %conversation.id(),
            owner = %owner.into_inner(),
            "conversation_started"
        );
        let reply = self.submit_user_message(conversation.id(), text).await?;
        Ok((conversation, reply))
    }

    /// Appends a user turn and runs the conversation until the model gives
    /// a final answer.
    ///
    /// Tool calls left pending by an earlier failed cycle are closed with
    /// aborted results first.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`]; see
    /// [`OrchestratorError::descriptor`] for which ones are recoverable.
    pub async fn submit_user_message(
        &self,
        conversation_id: ConversationId,
        text: &str,
    ) -> OrchestratorResult<Turn> {
        self.ensure_open(conversation_id).await?;
        let session = self.session(conversation_id);
        let _cycle = session.gate.lock().await;
        let token = session.begin();
        let outcome = self
            .user_cycle(conversation_id, text, &session, &token)
            .await;
        session.end(conversation_id);
        if let Err(err) = &outcome {
            warn!(
                conversation_id = %conversation_id,
                kind = err.kind(),
                recoverable = err.is_recoverable(),
                error = %err,
                "conversation_cycle_failed"
            );
        }
        outcome
    }

    /// Returns the turns of `range` in sequence order.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn get_turns(
        &self,
        conversation_id: ConversationId,
        range: TurnRange,
    ) -> OrchestratorResult<Vec<Turn>> {
        Ok(self
            .store
            .read_range(conversation_id, range)
            .collect_all()
            .await?)
    }

    /// Returns a lazy cursor over `range`.
    #[must_use]
    pub fn turn_cursor(
        &self,
        conversation_id: ConversationId,
        range: TurnRange,
    ) -> TurnCursor<'_, S> {
        self.store.read_range(conversation_id, range)
    }

    /// Cancels the running cycle of a conversation.
    ///
    /// In-flight tool calls are stopped, the round is abandoned, and the
    /// cycle returns [`OrchestratorError::Cancelled`]. A model reply that
    /// arrives after cancellation is discarded. Once the final assistant
    /// turn is being appended the cycle can no longer be stopped and
    /// completes normally. Returns `false` when no cycle was running.
    #[must_use = "cancellation reports whether a cycle was running"]
    pub fn cancel(&self, conversation_id: ConversationId) -> bool {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let cancelled = sessions
            .get(&conversation_id)
            .is_some_and(|session| session.cancel());
        if cancelled {
            info!(conversation_id = %conversation_id, "conversation_cycle_cancelled");
        }
        cancelled
    }

    /// Returns where the conversation is in its cycle.
    #[must_use]
    pub fn state(&self, conversation_id: ConversationId) -> ConversationState {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&conversation_id)
            .map_or(ConversationState::AwaitingUserInput, |session| {
                session.state()
            })
    }

    /// Soft-closes a conversation; later user messages are rejected.
    ///
    /// A running cycle is cancelled and awaited, then the conversation's
    /// session and round records are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::ConversationNotFound`] and metadata
    /// errors.
    pub async fn close_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> OrchestratorResult<Conversation> {
        let mut conversation = self
            .metadata
            .find_by_id(conversation_id)
            .await?
            .ok_or(OrchestratorError::ConversationNotFound(conversation_id))?;
        if !conversation.is_closed() {
            conversation.close(&*self.clock);
            self.metadata.update(&conversation).await?;
        }
        self.release(conversation_id).await;
        info!(conversation_id = %conversation_id, "conversation_closed");
        Ok(conversation)
    }

    /// Closes a conversation and removes all of its turns.
    ///
    /// The metadata record stays behind, closed, so the id keeps rejecting
    /// new messages.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::ConversationNotFound`], metadata errors
    /// and store errors.
    pub async fn delete_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> OrchestratorResult<()> {
        self.close_conversation(conversation_id).await?;
        self.store.delete_conversation(conversation_id).await?;
        info!(conversation_id = %conversation_id, "conversation_deleted");
        Ok(())
    }

    /// Cancels and awaits the running cycle, then drops every in-memory
    /// record kept for the conversation.
    async fn release(&self, conversation_id: ConversationId) {
        let session = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&conversation_id);
        if let Some(session) = session {
            if session.cancel() {
                info!(conversation_id = %conversation_id, "conversation_cycle_cancelled");
            }
            drop(session.gate.lock().await);
        }
        self.correlator.forget(conversation_id);
    }

    /// Reconciles tool calls left pending by a previous process.
    ///
    /// With [`RecoveryPolicy::Abandon`] every pending call gets an aborted
    /// tool turn. With [`RecoveryPolicy::Redispatch`] the calls run again
    /// and the cycle continues to a final assistant turn.
    ///
    /// # Errors
    ///
    /// Returns store and correlator errors, and any cycle error when
    /// re-dispatching.
    pub async fn recover(
        &self,
        conversation_id: ConversationId,
    ) -> OrchestratorResult<RecoveryReport> {
        let session = self.session(conversation_id);
        let _cycle = session.gate.lock().await;
        let pending = self.store.pending_tool_calls(conversation_id).await?;
        if pending.is_empty() {
            debug!(conversation_id = %conversation_id, "recovery_not_needed");
            return Ok(RecoveryReport::Clean);
        }

        info!(
            conversation_id = %conversation_id,
            pending = pending.len(),
            policy = ?self.config.recovery,
            "conversation_recovery_started"
        );
        self.correlator.reset_round(conversation_id);
        match self.config.recovery {
            RecoveryPolicy::Abandon => {
                let aborted = self
                    .correlator
                    .abandon(conversation_id, RECOVERY_REASON)
                    .await?;
                Ok(RecoveryReport::Abandoned { aborted })
            }
            RecoveryPolicy::Redispatch => {
                let token = session.begin();
                let outcome = self
                    .redispatch(conversation_id, pending, &session, &token)
                    .await;
                session.end(conversation_id);
                outcome.map(|reply| RecoveryReport::Redispatched { reply })
            }
        }
    }

    async fn ensure_open(&self, conversation_id: ConversationId) -> OrchestratorResult<()> {
        let conversation = self
            .metadata
            .find_by_id(conversation_id)
            .await?
            .ok_or(OrchestratorError::ConversationNotFound(conversation_id))?;
        if conversation.is_closed() {
            return Err(OrchestratorError::ConversationClosed(conversation_id));
        }
        Ok(())
    }

    async fn user_cycle(
        &self,
        conversation_id: ConversationId,
        text: &str,
        session: &Session,
        token: &CancellationToken,
    ) -> OrchestratorResult<Turn> {
        let draft = TurnDraft::user(conversation_id, text, &*self.clock)?;
        let stale = self.store.pending_tool_calls(conversation_id).await?;
        if !stale.is_empty() {
            warn!(
                conversation_id = %conversation_id,
                pending = stale.len(),
                "stale_tool_calls_abandoned"
            );
            self.correlator
                .abandon(conversation_id, SUPERSEDED_REASON)
                .await?;
        }
        let head = self.store.head(conversation_id).await?;
        let user_turn = append_with_retry(&*self.store, draft, head).await?;
        debug!(
            conversation_id = %conversation_id,
            sequence = user_turn.sequence_number().value(),
            "user_turn_appended"
        );
        self.drive(
            conversation_id,
            session,
            token,
            Some(user_turn.sequence_number()),
        )
        .await
    }

    async fn redispatch(
        &self,
        conversation_id: ConversationId,
        pending: Vec<ToolCallRequest>,
        session: &Session,
        token: &CancellationToken,
    ) -> OrchestratorResult<Turn> {
        self.correlator.open_round(conversation_id, pending.clone())?;
        session.transition(conversation_id, ConversationState::ToolRoundPending);
        let head = self.store.head(conversation_id).await?;
        let settled = self.run_round(conversation_id, pending, token, head).await?;
        session.transition(conversation_id, ConversationState::ToolRoundComplete);
        self.drive(conversation_id, session, token, settled).await
    }

    /// Thinks, runs tool rounds, and stops at a final answer or when the
    /// iteration budget runs out.
    async fn drive(
        &self,
        conversation_id: ConversationId,
        session: &Session,
        token: &CancellationToken,
        start: Option<SequenceNumber>,
    ) -> OrchestratorResult<Turn> {
        let mut head = start;
        let mut rounds: u32 = 0;
        loop {
            session.transition(conversation_id, ConversationState::AssistantThinking);
            let reply = self.complete(conversation_id, token).await?;
            if token.is_cancelled() {
                return Err(OrchestratorError::Cancelled(conversation_id));
            }
            let is_final = reply.is_final();
            let assistant = self.append_reply(conversation_id, reply, head).await?;
            head = Some(assistant.sequence_number());

            if is_final {
                session.transition(conversation_id, ConversationState::FinalResponse);
                info!(conversation_id = %conversation_id, rounds, "final_response");
                return Ok(assistant);
            }

            let requests = assistant.tool_calls().to_vec();
            self.correlator
                .open_round(conversation_id, requests.clone())?;
            session.transition(conversation_id, ConversationState::ToolRoundPending);
            if rounds >= self.config.iteration_budget {
                return self
                    .exhaust_budget(conversation_id, session, token, rounds)
                    .await;
            }
            rounds = rounds.saturating_add(1);
            head = self.run_round(conversation_id, requests, token, head).await?;
            session.transition(conversation_id, ConversationState::ToolRoundComplete);
        }
    }

    async fn complete(
        &self,
        conversation_id: ConversationId,
        token: &CancellationToken,
    ) -> OrchestratorResult<ModelReply> {
        let history = self.history(conversation_id).await?;
        let tools = self.invoker.capabilities();
        let policy = self.config.model_retry;
        let mut retries: u32 = 0;
        loop {
            let attempt = tokio::select! {
                biased;
                () = token.cancelled() => return Err(OrchestratorError::Cancelled(conversation_id)),
                reply = self.model.complete(&history, &tools) => reply,
            };
            let failure = match attempt {
                Ok(reply) => return Ok(reply),
                Err(err) if !err.is_transient() => {
                    return Err(OrchestratorError::InvalidModelReply {
                        conversation_id,
                        detail: err.to_string(),
                    });
                }
                Err(err) => err,
            };
            if !policy.allows_retry(retries) {
                return Err(OrchestratorError::ModelUnavailable {
                    conversation_id,
                    source: failure,
                });
            }
            let delay = policy.delay_for(retries);
            warn!(
                conversation_id = %conversation_id,
                retry = retries.saturating_add(1),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %failure,
                "model_backend_retrying"
            );
            tokio::select! {
                biased;
                () = token.cancelled() => return Err(OrchestratorError::Cancelled(conversation_id)),
                () = tokio::time::sleep(delay) => {}
            }
            retries = retries.saturating_add(1);
        }
    }

    /// Loads the last `history_limit` turns, skipping tool turns whose
    /// assistant turn fell outside the window.
    async fn history(&self, conversation_id: ConversationId) -> OrchestratorResult<Vec<Turn>> {
        let Some(head) = self.store.head(conversation_id).await? else {
            return Ok(Vec::new());
        };
        let mut turns = self
            .store
            .read_range(
                conversation_id,
                TurnRange::last(self.config.history_limit, head),
            )
            .collect_all()
            .await?;
        let orphaned = turns
            .iter()
            .take_while(|turn| turn.role() == Role::Tool)
            .count();
        Ok(turns.split_off(orphaned))
    }

    async fn append_reply(
        &self,
        conversation_id: ConversationId,
        reply: ModelReply,
        head: Option<SequenceNumber>,
    ) -> OrchestratorResult<Turn> {
        let draft = reply.into_draft(conversation_id, &*self.clock);
        let rejected = |detail: String| OrchestratorError::InvalidModelReply {
            conversation_id,
            detail,
        };
        draft.validate().map_err(|err| rejected(err.to_string()))?;
        append_with_retry(&*self.store, draft, head)
            .await
            .map_err(|err| match err {
                TurnStoreError::Ledger(violation) => rejected(violation.to_string()),
                TurnStoreError::InvalidTurn(invalid) => rejected(invalid.to_string()),
                other => OrchestratorError::Store(other),
            })
    }

    async fn exhaust_budget(
        &self,
        conversation_id: ConversationId,
        session: &Session,
        token: &CancellationToken,
        rounds: u32,
    ) -> OrchestratorResult<Turn> {
        warn!(
            conversation_id = %conversation_id,
            budget = self.config.iteration_budget,
            "iteration_budget_exceeded"
        );
        self.correlator
            .abandon(conversation_id, BUDGET_REASON)
            .await?;
        if token.is_cancelled() {
            return Err(OrchestratorError::Cancelled(conversation_id));
        }
        let head = self.store.head(conversation_id).await?;
        let notice = format!(
            "I stopped after {rounds} tool rounds because the iteration budget was exhausted. \
             The last requested tool calls were not run."
        );
        let turn = append_with_retry(
            &*self.store,
            TurnDraft::assistant(conversation_id, notice, &*self.clock),
            head,
        )
        .await?;
        session.transition(conversation_id, ConversationState::FinalResponse);
        Ok(turn)
    }

    /// Runs every request concurrently and records each outcome as it
    /// arrives. Returns the new head once the round is complete.
    async fn run_round(
        &self,
        conversation_id: ConversationId,
        requests: Vec<ToolCallRequest>,
        token: &CancellationToken,
        head: Option<SequenceNumber>,
    ) -> OrchestratorResult<Option<SequenceNumber>> {
        let round_token = token.child_token();
        let mut tasks = JoinSet::new();
        for request in requests {
            let invoker = Arc::clone(&self.invoker);
            let cancel = round_token.clone();
            let timeout = self.config.tool_timeout;
            tasks.spawn(async move {
                let outcome = invoker.dispatch(&request, Some(timeout), &cancel).await;
                (request, outcome)
            });
        }
        debug!(conversation_id = %conversation_id, calls = tasks.len(), "tool_round_dispatched");

        let mut settled = head;
        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => None,
                finished = tasks.join_next() => Some(finished),
            };
            let Some(joined) = next else {
                self.stop_round(conversation_id, &round_token, &mut tasks, CANCELLED_REASON)
                    .await?;
                return Err(OrchestratorError::Cancelled(conversation_id));
            };
            let Some(task) = joined else { break };
            match task {
                Ok((request, outcome)) => {
                    let recorded = self
                        .record_outcome(conversation_id, &request, outcome, settled)
                        .await;
                    let (sequence, complete) = match recorded {
                        Ok(recorded) => recorded,
                        Err(err) => {
                            let stopped = self
                                .stop_round(
                                    conversation_id,
                                    &round_token,
                                    &mut tasks,
                                    STORE_FAILED_REASON,
                                )
                                .await;
                            if let Err(cleanup) = stopped {
                                warn!(
                                    conversation_id = %conversation_id,
                                    error = %cleanup,
                                    "tool_round_cleanup_failed"
                                );
                            }
                            return Err(err);
                        }
                    };
                    settled = Some(sequence);
                    if complete {
                        return Ok(settled);
                    }
                }
                Err(err) => {
                    warn!(conversation_id = %conversation_id, error = %err, "tool_task_failed");
                }
            }
        }

        if self.correlator.round_state(conversation_id) == Some(RoundState::Open) {
            let aborted = self
                .correlator
                .abandon(conversation_id, TASK_FAILED_REASON)
                .await?;
            settled = aborted.last().map(Turn::sequence_number).or(settled);
        }
        Ok(settled)
    }

    /// Cancels the round's invocations, waits for them to stop, and
    /// abandons the round. Outcomes still arriving are discarded.
    async fn stop_round(
        &self,
        conversation_id: ConversationId,
        round_token: &CancellationToken,
        tasks: &mut JoinSet<(ToolCallRequest, InvocationOutcome)>,
        reason: &str,
    ) -> OrchestratorResult<Vec<Turn>> {
        round_token.cancel();
        while tasks.join_next().await.is_some() {}
        Ok(self.correlator.abandon(conversation_id, reason).await?)
    }

    async fn record_outcome(
        &self,
        conversation_id: ConversationId,
        request: &ToolCallRequest,
        outcome: InvocationOutcome,
        head: Option<SequenceNumber>,
    ) -> OrchestratorResult<(SequenceNumber, bool)> {
        let result = outcome.into_tool_result();
        let draft = TurnDraft::tool(
            conversation_id,
            request.id().clone(),
            result.clone(),
            &*self.clock,
        );
        let turn = append_with_retry(&*self.store, draft, head).await?;
        debug!(
            conversation_id = %conversation_id,
            call_id = %request.id(),
            tool = request.tool_name(),
            error_kind = result.error_kind().map(ToolErrorKind::as_str),
            "tool_turn_appended"
        );
        let complete = self
            .correlator
            .resolve(conversation_id, request.id(), result);
        Ok((turn.sequence_number(), complete))
    }
}
