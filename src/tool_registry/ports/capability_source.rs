//! Port for querying a provider's live tool list.

use crate::tool_registry::domain::{ProviderId, ToolCapability, ToolProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for capability queries.
pub type CapabilitySourceResult<T> = Result<T, CapabilitySourceError>;

/// Asks a running provider which tools it currently offers.
#[async_trait]
pub trait CapabilitySource: Send + Sync {
    /// Lists the tools exposed by `provider`.
    async fn list_tools(
        &self,
        provider: &ToolProvider,
    ) -> CapabilitySourceResult<Vec<ToolCapability>>;
}

/// Errors returned by capability source adapters.
#[derive(Debug, Clone, Error)]
pub enum CapabilitySourceError {
    /// The provider did not answer.
    #[error("provider {0} is unreachable")]
    Unreachable(ProviderId),

    /// The provider answered with something unusable.
    #[error("provider capability query failed: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl CapabilitySourceError {
    /// Wraps a runtime failure.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}
