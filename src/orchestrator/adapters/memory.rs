//! Scripted model backend for deterministic tests and demos.

use crate::conversation::domain::Turn;
use crate::orchestrator::{
    domain::ModelReply,
    ports::{ModelBackend, ModelBackendError, ModelBackendResult},
};
use crate::tool_registry::domain::ToolCapability;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct Script {
    queued: VecDeque<ModelBackendResult<ModelReply>>,
    fallback: Option<ModelBackendResult<ModelReply>>,
    seen: Vec<Vec<Turn>>,
}

/// Model backend that replays queued replies in order.
///
/// Once the queue is empty the `always` reply repeats; without one the
/// backend reports itself unavailable. Each call's history is recorded.
#[derive(Debug, Clone, Default)]
pub struct ScriptedModelBackend {
    script: Arc<Mutex<Script>>,
}

impl ScriptedModelBackend {
    /// Creates a backend with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_script<T>(&self, edit: impl FnOnce(&mut Script) -> T) -> T {
        edit(&mut self.script.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Queues a reply.
    pub fn push_reply(&self, reply: ModelReply) {
        self.with_script(|script| script.queued.push_back(Ok(reply)));
    }

    /// Queues a failure.
    pub fn push_failure(&self, error: ModelBackendError) {
        self.with_script(|script| script.queued.push_back(Err(error)));
    }

    /// Sets the reply repeated once the queue is empty.
    pub fn always(&self, reply: ModelReply) {
        self.with_script(|script| script.fallback = Some(Ok(reply)));
    }

    /// Returns the history passed to each call, oldest call first.
    #[must_use]
    pub fn histories(&self) -> Vec<Vec<Turn>> {
        self.with_script(|script| script.seen.clone())
    }
}

#[async_trait]
impl ModelBackend for ScriptedModelBackend {
    async fn complete(
        &self,
        history: &[Turn],
        _tools: &[ToolCapability],
    ) -> ModelBackendResult<ModelReply> {
        self.with_script(|script| {
            script.seen.push(history.to_vec());
            script
                .queued
                .pop_front()
                .or_else(|| script.fallback.clone())
                .unwrap_or_else(|| {
                    Err(ModelBackendError::Unavailable(
                        "no scripted reply left".to_owned(),
                    ))
                })
        })
    }
}
