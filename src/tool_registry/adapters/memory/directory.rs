//! In-memory provider directory.

use crate::tool_registry::{
    domain::{ProviderId, ToolProvider},
    ports::{ProviderDirectory, ProviderDirectoryError, ProviderDirectoryResult},
};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// Directory whose listing is set by the caller.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProviderDirectory {
    listed: Arc<RwLock<Vec<ToolProvider>>>,
}

impl InMemoryProviderDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a listed provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderDirectoryError::Unavailable`] when the lock is
    /// poisoned.
    pub fn publish(&self, provider: ToolProvider) -> ProviderDirectoryResult<()> {
        let mut listed = self.listed.write().map_err(|err| {
            ProviderDirectoryError::unavailable(std::io::Error::other(err.to_string()))
        })?;
        listed.retain(|existing| existing.id() != provider.id());
        listed.push(provider);
        Ok(())
    }

    /// Removes a provider from the listing.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderDirectoryError::Unavailable`] when the lock is
    /// poisoned.
    pub fn withdraw(&self, provider_id: ProviderId) -> ProviderDirectoryResult<()> {
        let mut listed = self.listed.write().map_err(|err| {
            ProviderDirectoryError::unavailable(std::io::Error::other(err.to_string()))
        })?;
        listed.retain(|existing| existing.id() != provider_id);
        Ok(())
    }
}

#[async_trait]
impl ProviderDirectory for InMemoryProviderDirectory {
    async fn list_active(&self) -> ProviderDirectoryResult<Vec<ToolProvider>> {
        let listed = self.listed.read().map_err(|err| {
            ProviderDirectoryError::unavailable(std::io::Error::other(err.to_string()))
        })?;
        let mut providers = listed.clone();
        providers.sort_by(|left, right| left.name().cmp(right.name()));
        Ok(providers)
    }
}
