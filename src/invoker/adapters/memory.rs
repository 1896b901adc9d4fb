//! Scripted transport for deterministic tests.

use crate::conversation::domain::{ToolCallId, ToolResultStatus};
use crate::invoker::{
    domain::{ToolCallEnvelope, ToolResponse},
    ports::{ToolTransport, TransportError, TransportResult},
};
use crate::tool_registry::domain::ToolProvider;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted reaction to a sent envelope.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Answer with `status` and `payload` after `delay`.
    Reply {
        /// Reported status.
        status: ToolResultStatus,
        /// Reported payload.
        payload: Value,
        /// Simulated latency.
        delay: Duration,
    },
    /// Fail delivery.
    TransportFailure(TransportError),
    /// Never answer.
    Hang,
    /// Answer with a call id other than the one sent.
    WrongCallId,
}

impl ScriptStep {
    /// A successful reply.
    #[must_use]
    pub const fn ok(payload: Value) -> Self {
        Self::Reply {
            status: ToolResultStatus::Ok,
            payload,
            delay: Duration::ZERO,
        }
    }

    /// A provider-reported failure.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Reply {
            status: ToolResultStatus::Error,
            payload: Value::String(message.into()),
            delay: Duration::ZERO,
        }
    }

    /// Delays a reply step; other steps are returned unchanged.
    #[must_use]
    pub fn after(self, latency: Duration) -> Self {
        match self {
            Self::Reply {
                status, payload, ..
            } => Self::Reply {
                status,
                payload,
                delay: latency,
            },
            other => other,
        }
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    queued: HashMap<String, VecDeque<ScriptStep>>,
    fallback: HashMap<String, ScriptStep>,
    sent: Vec<ToolCallEnvelope>,
    cancelled: Vec<ToolCallId>,
}

impl ScriptState {
    fn next_step(&mut self, tool_name: &str) -> ScriptStep {
        self.queued
            .get_mut(tool_name)
            .and_then(VecDeque::pop_front)
            .or_else(|| self.fallback.get(tool_name).cloned())
            .unwrap_or_else(|| {
                ScriptStep::TransportFailure(TransportError::Protocol(format!(
                    "no script for tool '{tool_name}'"
                )))
            })
    }
}

/// Transport that replays scripted steps per tool name.
///
/// Queued steps are consumed first; once a tool's queue is empty its
/// `always` step repeats. Every sent envelope and cancellation is recorded.
#[derive(Debug, Clone, Default)]
pub struct ScriptedToolTransport {
    state: Arc<Mutex<ScriptState>>,
}

fn poisoned(err: impl ToString) -> TransportError {
    TransportError::io(std::io::Error::other(err.to_string()))
}

impl ScriptedToolTransport {
    /// Creates a transport with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a one-shot step for `tool_name`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] when the lock is poisoned.
    pub fn push(&self, tool_name: &str, step: ScriptStep) -> TransportResult<()> {
        let mut state = self.state.lock().map_err(poisoned)?;
        state
            .queued
            .entry(tool_name.to_owned())
            .or_default()
            .push_back(step);
        Ok(())
    }

    /// Sets the step repeated once the queue for `tool_name` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] when the lock is poisoned.
    pub fn always(&self, tool_name: &str, step: ScriptStep) -> TransportResult<()> {
        let mut state = self.state.lock().map_err(poisoned)?;
        state.fallback.insert(tool_name.to_owned(), step);
        Ok(())
    }

    /// Returns every envelope sent so far.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] when the lock is poisoned.
    pub fn sent(&self) -> TransportResult<Vec<ToolCallEnvelope>> {
        Ok(self.state.lock().map_err(poisoned)?.sent.clone())
    }

    /// Returns every call id the invoker asked to cancel.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] when the lock is poisoned.
    pub fn cancelled(&self) -> TransportResult<Vec<ToolCallId>> {
        Ok(self.state.lock().map_err(poisoned)?.cancelled.clone())
    }
}

#[async_trait]
impl ToolTransport for ScriptedToolTransport {
    async fn send(
        &self,
        _provider: &ToolProvider,
        envelope: ToolCallEnvelope,
    ) -> TransportResult<ToolResponse> {
        let step = {
            let mut state = self.state.lock().map_err(poisoned)?;
            state.sent.push(envelope.clone());
            state.next_step(&envelope.tool_name)
        };

        match step {
            ScriptStep::Reply {
                status,
                payload,
                delay,
            } => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(ToolResponse {
                    call_id: envelope.call_id,
                    status,
                    payload,
                })
            }
            ScriptStep::TransportFailure(err) => Err(err),
            ScriptStep::Hang => std::future::pending().await,
            ScriptStep::WrongCallId => Ok(ToolResponse {
                call_id: ToolCallId::new(format!("{}-stale", envelope.call_id))
                    .map_err(|err| TransportError::Protocol(err.to_string()))?,
                status: ToolResultStatus::Ok,
                payload: Value::Null,
            }),
        }
    }

    async fn cancel(&self, _provider: &ToolProvider, call_id: &ToolCallId) -> TransportResult<()> {
        self.state
            .lock()
            .map_err(poisoned)?
            .cancelled
            .push(call_id.clone());
        Ok(())
    }
}
