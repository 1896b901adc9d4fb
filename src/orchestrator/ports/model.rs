//! Port for the language model that drives the conversation.

use crate::conversation::domain::Turn;
use crate::orchestrator::domain::ModelReply;
use crate::tool_registry::domain::ToolCapability;
use async_trait::async_trait;
use thiserror::Error;

/// Result type for model backend calls.
pub type ModelBackendResult<T> = Result<T, ModelBackendError>;

/// Produces the next assistant turn from the conversation history.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Completes `history`, offering `tools` to the model.
    async fn complete(
        &self,
        history: &[Turn],
        tools: &[ToolCapability],
    ) -> ModelBackendResult<ModelReply>;
}

/// Model backend failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelBackendError {
    /// The backend could not be reached or is overloaded. Retried.
    #[error("model backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with something unusable. Not retried.
    #[error("model backend returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl ModelBackendError {
    /// Returns `true` for failures worth retrying.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
