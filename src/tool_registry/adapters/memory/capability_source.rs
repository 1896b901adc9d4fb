//! In-memory capability source for deterministic tests.

use crate::tool_registry::{
    domain::{ProviderId, ToolCapability, ToolProvider},
    ports::{CapabilitySource, CapabilitySourceError, CapabilitySourceResult},
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Capability source backed by per-provider catalogues.
///
/// Providers without a catalogue answer with the tools they were
/// registered with; providers marked down fail with
/// [`CapabilitySourceError::Unreachable`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryCapabilitySource {
    state: Arc<RwLock<SourceState>>,
}

#[derive(Debug, Default)]
struct SourceState {
    catalogues: HashMap<ProviderId, Vec<ToolCapability>>,
    down: HashSet<ProviderId>,
}

fn poisoned(err: impl ToString) -> CapabilitySourceError {
    CapabilitySourceError::runtime(std::io::Error::other(err.to_string()))
}

impl InMemoryCapabilitySource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tools a provider will report.
    ///
    /// # Errors
    ///
    /// Returns runtime errors when the lock is poisoned.
    pub fn set_catalogue(
        &self,
        provider_id: ProviderId,
        tools: Vec<ToolCapability>,
    ) -> CapabilitySourceResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.catalogues.insert(provider_id, tools);
        Ok(())
    }

    /// Marks a provider as unreachable or reachable again.
    ///
    /// # Errors
    ///
    /// Returns runtime errors when the lock is poisoned.
    pub fn set_down(&self, provider_id: ProviderId, down: bool) -> CapabilitySourceResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if down {
            state.down.insert(provider_id);
        } else {
            state.down.remove(&provider_id);
        }
        Ok(())
    }
}

#[async_trait]
impl CapabilitySource for InMemoryCapabilitySource {
    async fn list_tools(
        &self,
        provider: &ToolProvider,
    ) -> CapabilitySourceResult<Vec<ToolCapability>> {
        let state = self.state.read().map_err(poisoned)?;
        if state.down.contains(&provider.id()) {
            return Err(CapabilitySourceError::Unreachable(provider.id()));
        }
        Ok(state
            .catalogues
            .get(&provider.id())
            .cloned()
            .unwrap_or_else(|| provider.capabilities().to_vec()))
    }
}
