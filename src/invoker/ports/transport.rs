//! Port for delivering tool calls to providers.

use crate::conversation::domain::ToolCallId;
use crate::invoker::domain::{ToolCallEnvelope, ToolResponse};
use crate::tool_registry::domain::{ProviderId, ToolProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Carries envelopes to a provider over whatever channel its descriptor
/// names (process pipe, HTTP, event stream).
///
/// Implementations must be cancel-safe: the invoker drops the `send` future
/// when the deadline passes.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Sends one call and waits for the provider's response.
    async fn send(
        &self,
        provider: &ToolProvider,
        envelope: ToolCallEnvelope,
    ) -> TransportResult<ToolResponse>;

    /// Asks the provider to stop working on a call. Best effort; failures
    /// are ignored by the invoker.
    async fn cancel(&self, provider: &ToolProvider, call_id: &ToolCallId) -> TransportResult<()>;
}

/// Failures to deliver a call or read its response.
///
/// A provider-reported error travels inside [`ToolResponse`], not here.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The provider could not be reached.
    #[error("provider {0} is unreachable")]
    Unreachable(ProviderId),

    /// The provider answered outside the wire contract.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The underlying channel failed.
    #[error("transport I/O failure: {0}")]
    Io(Arc<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wraps a channel failure.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Arc::new(err))
    }
}
