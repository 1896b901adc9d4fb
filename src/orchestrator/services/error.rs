//! Orchestrator service errors.

use crate::conversation::{
    domain::{ConversationId, TurnDomainError},
    ports::{MetadataStoreError, TurnStoreError},
};
use crate::correlator::services::CorrelatorError;
use crate::orchestrator::{domain::ErrorDescriptor, ports::ModelBackendError};
use thiserror::Error;

/// Errors surfaced by [`ConversationOrchestrator`](super::ConversationOrchestrator).
///
/// Tool failures never appear here; they are recorded in the log as tool
/// turns.
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    /// No metadata exists for the conversation.
    #[error("conversation {0} does not exist")]
    ConversationNotFound(ConversationId),

    /// The conversation was closed.
    #[error("conversation {0} is closed")]
    ConversationClosed(ConversationId),

    /// The input failed validation.
    #[error(transparent)]
    InvalidInput(#[from] TurnDomainError),

    /// The model backend stayed unavailable after retries.
    #[error("model backend unavailable for conversation {conversation_id}: {source}")]
    ModelUnavailable {
        /// Affected conversation.
        conversation_id: ConversationId,
        /// Last backend failure.
        source: ModelBackendError,
    },

    /// The model produced a reply that cannot be recorded.
    #[error("model reply rejected for conversation {conversation_id}: {detail}")]
    InvalidModelReply {
        /// Affected conversation.
        conversation_id: ConversationId,
        /// Why the reply was rejected.
        detail: String,
    },

    /// The cycle was cancelled.
    #[error("cycle of conversation {0} was cancelled")]
    Cancelled(ConversationId),

    /// The turn store failed; conflicts were already retried once.
    #[error(transparent)]
    Store(#[from] TurnStoreError),

    /// The metadata store failed.
    #[error(transparent)]
    Metadata(#[from] MetadataStoreError),

    /// Round bookkeeping failed.
    #[error(transparent)]
    Correlator(#[from] CorrelatorError),
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

impl OrchestratorError {
    /// Returns `true` when the conversation stays usable and resubmitting
    /// may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::ModelUnavailable { .. } | Self::InvalidModelReply { .. } | Self::Cancelled(_) => {
                true
            }
            Self::Store(err) => err.is_conflict(),
            Self::Correlator(CorrelatorError::Store(err)) => err.is_conflict(),
            Self::ConversationNotFound(_)
            | Self::ConversationClosed(_)
            | Self::InvalidInput(_)
            | Self::Metadata(_)
            | Self::Correlator(_) => false,
        }
    }

    /// Returns the taxonomy name of the error.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConversationNotFound(_) => "ConversationNotFound",
            Self::ConversationClosed(_) => "ConversationClosed",
            Self::InvalidInput(_) => "InvalidInput",
            Self::ModelUnavailable { .. } => "ModelUnavailableError",
            Self::InvalidModelReply { .. } => "InvalidModelReply",
            Self::Cancelled(_) => "Cancelled",
            Self::Store(err) | Self::Correlator(CorrelatorError::Store(err))
                if err.is_conflict() =>
            {
                "ConflictError"
            }
            Self::Store(_) | Self::Metadata(_) => "StorageError",
            Self::Correlator(_) => "CorrelationError",
        }
    }

    /// Summarises the error for callers.
    #[must_use]
    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            kind: self.kind(),
            message: self.to_string(),
            recoverable: self.is_recoverable(),
        }
    }
}
