//! In-memory conversation metadata store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::conversation::{
    domain::{Conversation, ConversationId},
    ports::{ConversationMetadataStore, MetadataStoreError, MetadataStoreResult},
};

/// Thread-safe in-memory metadata store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationStore {
    state: Arc<RwLock<HashMap<ConversationId, Conversation>>>,
}

impl InMemoryConversationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl ToString) -> MetadataStoreError {
    MetadataStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl ConversationMetadataStore for InMemoryConversationStore {
    async fn create(&self, conversation: &Conversation) -> MetadataStoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.contains_key(&conversation.id()) {
            return Err(MetadataStoreError::DuplicateConversation(conversation.id()));
        }
        state.insert(conversation.id(), conversation.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        conversation_id: ConversationId,
    ) -> MetadataStoreResult<Option<Conversation>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.get(&conversation_id).cloned())
    }

    async fn update(&self, conversation: &Conversation) -> MetadataStoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let slot = state
            .get_mut(&conversation.id())
            .ok_or(MetadataStoreError::NotFound(conversation.id()))?;
        *slot = conversation.clone();
        Ok(())
    }
}
