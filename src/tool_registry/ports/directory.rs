//! Port for the external catalogue of active providers.

use crate::tool_registry::domain::ToolProvider;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for provider directory queries.
pub type ProviderDirectoryResult<T> = Result<T, ProviderDirectoryError>;

/// Read-only source of provider descriptors.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    /// Lists every active provider, ordered by name.
    async fn list_active(&self) -> ProviderDirectoryResult<Vec<ToolProvider>>;
}

/// Errors returned by provider directory adapters.
#[derive(Debug, Clone, Error)]
pub enum ProviderDirectoryError {
    /// Stored descriptors could not be decoded.
    #[error("invalid provider descriptor: {0}")]
    InvalidDescriptor(Arc<dyn std::error::Error + Send + Sync>),

    /// The directory backend failed.
    #[error("provider directory unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl ProviderDirectoryError {
    /// Wraps a descriptor decoding failure.
    pub fn invalid_descriptor(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidDescriptor(Arc::new(err))
    }

    /// Wraps a backend failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
