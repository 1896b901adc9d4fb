//! Conversation metadata port: title and ownership CRUD.

use crate::conversation::domain::{Conversation, ConversationId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for metadata store operations.
pub type MetadataStoreResult<T> = Result<T, MetadataStoreError>;

/// Persistence contract for conversation metadata.
#[async_trait]
pub trait ConversationMetadataStore: Send + Sync {
    /// Stores new conversation metadata.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataStoreError::DuplicateConversation`] when the ID is
    /// already stored.
    async fn create(&self, conversation: &Conversation) -> MetadataStoreResult<()>;

    /// Finds conversation metadata by identifier.
    async fn find_by_id(
        &self,
        conversation_id: ConversationId,
    ) -> MetadataStoreResult<Option<Conversation>>;

    /// Persists changes to existing metadata.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataStoreError::NotFound`] when the conversation does
    /// not exist.
    async fn update(&self, conversation: &Conversation) -> MetadataStoreResult<()>;
}

/// Errors returned by metadata store implementations.
#[derive(Debug, Clone, Error)]
pub enum MetadataStoreError {
    /// Metadata with this identifier already exists.
    #[error("duplicate conversation: {0}")]
    DuplicateConversation(ConversationId),

    /// No metadata exists for this identifier.
    #[error("conversation not found: {0}")]
    NotFound(ConversationId),

    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted conversation data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("conversation persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl MetadataStoreError {
    /// Wraps persisted-data decoding failures.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
