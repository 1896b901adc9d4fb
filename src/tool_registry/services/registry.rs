//! Copy-on-write tool registry.

use crate::tool_registry::{
    domain::{ProviderId, ProviderName, ToolCapability, ToolProvider, ToolRegistryDomainError},
    ports::{
        CapabilitySource, ProviderDirectory, ProviderDirectoryError, ResolveError, ToolResolver,
    },
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Service-level errors for registry mutations.
#[derive(Debug, Error)]
pub enum ToolRegistryError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] ToolRegistryDomainError),

    /// Another provider is registered under the same name.
    #[error("provider name {name} is already registered as {existing}")]
    DuplicateProviderName {
        /// Contested name.
        name: ProviderName,
        /// Provider currently holding the name.
        existing: ProviderId,
    },

    /// No provider is registered with this identifier.
    #[error("provider {0} is not registered")]
    NotFound(ProviderId),

    /// The provider directory could not be read.
    #[error(transparent)]
    Directory(#[from] ProviderDirectoryError),
}

/// Result type for registry mutations.
pub type ToolRegistryResult<T> = Result<T, ToolRegistryError>;

/// Immutable view of every registered provider.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    version: u64,
    providers: HashMap<ProviderId, Arc<ToolProvider>>,
    by_tool: HashMap<String, Vec<ProviderId>>,
}

impl RegistrySnapshot {
    fn build(version: u64, providers: HashMap<ProviderId, Arc<ToolProvider>>) -> Self {
        let mut by_tool: HashMap<String, Vec<ProviderId>> = HashMap::new();
        for provider in providers.values() {
            for capability in provider.capabilities() {
                by_tool
                    .entry(capability.name().to_owned())
                    .or_default()
                    .push(provider.id());
            }
        }
        Self {
            version,
            providers,
            by_tool,
        }
    }

    /// Returns the number of swaps that produced this snapshot.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns `true` when no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Returns every provider ordered by name.
    #[must_use]
    pub fn providers(&self) -> Vec<Arc<ToolProvider>> {
        let mut listed: Vec<_> = self.providers.values().cloned().collect();
        listed.sort_by(|left, right| left.name().cmp(right.name()));
        listed
    }

    fn find(&self, provider_id: ProviderId) -> Option<Arc<ToolProvider>> {
        self.providers.get(&provider_id).cloned()
    }

    fn holder_of(&self, name: &ProviderName) -> Option<ProviderId> {
        self.providers
            .values()
            .find(|provider| provider.name() == name)
            .map(|provider| provider.id())
    }

    fn resolve(&self, tool_name: &str) -> Result<Arc<ToolProvider>, ResolveError> {
        let candidates: Vec<_> = self
            .by_tool
            .get(tool_name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.providers.get(id))
            .collect();
        match candidates.as_slice() {
            [] => Err(ResolveError::Unknown(tool_name.to_owned())),
            [single] => Ok(Arc::clone(single)),
            several => {
                let mut providers: Vec<_> = several
                    .iter()
                    .map(|provider| provider.name().clone())
                    .collect();
                providers.sort();
                Err(ResolveError::Ambiguous {
                    tool_name: tool_name.to_owned(),
                    providers,
                })
            }
        }
    }

    fn capabilities(&self) -> Vec<ToolCapability> {
        self.providers()
            .iter()
            .flat_map(|provider| provider.capabilities().iter().cloned())
            .collect()
    }
}

/// Outcome of [`ToolRegistry::sync_from_directory`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Providers newly registered or replaced with a changed descriptor.
    pub registered: Vec<ProviderName>,
    /// Providers removed because the directory no longer lists them.
    pub deregistered: Vec<ProviderName>,
    /// Providers kept as they were.
    pub unchanged: usize,
}

/// Shared registry mapping tool names to providers.
///
/// Readers clone the current [`RegistrySnapshot`]; writers build a new
/// snapshot and swap it in under a short write lock. Snapshots are replaced
/// whole, so a poisoned lock still guards a consistent value and is
/// recovered rather than reported.
pub struct ToolRegistry<S, C>
where
    S: CapabilitySource,
    C: Clock + Send + Sync,
{
    current: RwLock<Arc<RegistrySnapshot>>,
    source: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> ToolRegistry<S, C>
where
    S: CapabilitySource,
    C: Clock + Send + Sync,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new(source: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            current: RwLock::new(Arc::new(RegistrySnapshot::default())),
            source,
            clock,
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn swap<T>(
        &self,
        edit: impl FnOnce(
            &RegistrySnapshot,
            &mut HashMap<ProviderId, Arc<ToolProvider>>,
        ) -> ToolRegistryResult<T>,
    ) -> ToolRegistryResult<T> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut providers = guard.providers.clone();
        let outcome = edit(&guard, &mut providers)?;
        let version = guard.version.saturating_add(1);
        *guard = Arc::new(RegistrySnapshot::build(version, providers));
        Ok(outcome)
    }

    /// Registers a provider. Registering an identical provider again is a
    /// no-op; registering a changed descriptor under the same id replaces
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryError::DuplicateProviderName`] when another
    /// provider already uses the name.
    pub fn register(&self, provider: ToolProvider) -> ToolRegistryResult<Arc<ToolProvider>> {
        if let Some(existing) = self.snapshot().find(provider.id())
            && *existing == provider
        {
            return Ok(existing);
        }

        let registered = Arc::new(provider);
        self.swap(|snapshot, providers| {
            if let Some(holder) = snapshot.holder_of(registered.name())
                && holder != registered.id()
            {
                return Err(ToolRegistryError::DuplicateProviderName {
                    name: registered.name().clone(),
                    existing: holder,
                });
            }
            providers.insert(registered.id(), Arc::clone(&registered));
            Ok(())
        })?;
        info!(
            provider_id = %registered.id(),
            provider = %registered.name(),
            tools = registered.capabilities().len(),
            "provider_registered"
        );
        Ok(registered)
    }

    /// Removes a provider. Returns `false` when it was not registered.
    #[must_use = "deregistration reports whether the provider was present"]
    pub fn deregister(&self, provider_id: ProviderId) -> bool {
        if self.snapshot().find(provider_id).is_none() {
            return false;
        }
        let removed = self
            .swap(|_, providers| Ok(providers.remove(&provider_id)))
            .ok()
            .flatten();
        if let Some(provider) = &removed {
            info!(provider_id = %provider_id, provider = %provider.name(), "provider_deregistered");
        }
        removed.is_some()
    }

    /// Re-queries a provider's tool list.
    ///
    /// When the query fails the provider is kept and marked unreachable, so
    /// calls to its tools fail explicitly instead of becoming unknown.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryError::NotFound`] when the provider is not (or
    /// no longer) registered, and domain errors when the new tool list
    /// repeats a name.
    pub async fn refresh_capabilities(
        &self,
        provider_id: ProviderId,
    ) -> ToolRegistryResult<Arc<ToolProvider>> {
        let provider = self
            .snapshot()
            .find(provider_id)
            .ok_or(ToolRegistryError::NotFound(provider_id))?;

        let refreshed = match self.source.list_tools(&provider).await {
            Ok(capabilities) => {
                debug!(
                    provider_id = %provider_id,
                    tools = capabilities.len(),
                    "provider_capabilities_refreshed"
                );
                provider.with_refreshed_capabilities(capabilities, &*self.clock)?
            }
            Err(err) => {
                warn!(provider_id = %provider_id, error = %err, "provider_marked_unreachable");
                provider.marked_unreachable(err.to_string(), &*self.clock)
            }
        };

        let updated = Arc::new(refreshed);
        self.swap(|_, providers| {
            let slot = providers
                .get_mut(&provider_id)
                .ok_or(ToolRegistryError::NotFound(provider_id))?;
            *slot = Arc::clone(&updated);
            Ok(())
        })?;
        Ok(updated)
    }

    /// Makes the registry mirror the directory's active providers.
    ///
    /// Providers still listed with the same descriptor keep their liveness
    /// and refreshed capabilities. The swap is all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns directory errors, or
    /// [`ToolRegistryError::DuplicateProviderName`] when the listing itself
    /// repeats a name.
    pub async fn sync_from_directory<D>(&self, directory: &D) -> ToolRegistryResult<SyncReport>
    where
        D: ProviderDirectory + ?Sized,
    {
        let listed = directory.list_active().await?;
        let report = self.swap(|snapshot, providers| {
            let mut report = SyncReport::default();
            let mut next: HashMap<ProviderId, Arc<ToolProvider>> = HashMap::new();
            let mut names: HashMap<ProviderName, ProviderId> = HashMap::new();

            for descriptor in listed {
                if let Some(holder) = names.insert(descriptor.name().clone(), descriptor.id())
                    && holder != descriptor.id()
                {
                    return Err(ToolRegistryError::DuplicateProviderName {
                        name: descriptor.name().clone(),
                        existing: holder,
                    });
                }
                let kept = snapshot.find(descriptor.id()).filter(|existing| {
                    existing.name() == descriptor.name()
                        && existing.transport() == descriptor.transport()
                });
                let entry = if let Some(existing) = kept {
                    report.unchanged = report.unchanged.saturating_add(1);
                    existing
                } else {
                    report.registered.push(descriptor.name().clone());
                    Arc::new(descriptor)
                };
                next.insert(entry.id(), entry);
            }

            report.deregistered.extend(
                providers
                    .values()
                    .filter(|provider| !next.contains_key(&provider.id()))
                    .map(|provider| provider.name().clone()),
            );
            *providers = next;
            report.registered.sort();
            report.deregistered.sort();
            Ok(report)
        })?;

        info!(
            registered = report.registered.len(),
            deregistered = report.deregistered.len(),
            unchanged = report.unchanged,
            "provider_directory_synced"
        );
        Ok(report)
    }
}

impl<S, C> ToolResolver for ToolRegistry<S, C>
where
    S: CapabilitySource,
    C: Clock + Send + Sync,
{
    fn resolve(&self, tool_name: &str) -> Result<Arc<ToolProvider>, ResolveError> {
        self.snapshot().resolve(tool_name)
    }

    fn current(&self, provider_id: ProviderId) -> Option<Arc<ToolProvider>> {
        self.snapshot().find(provider_id)
    }

    fn capabilities(&self) -> Vec<ToolCapability> {
        self.snapshot().capabilities()
    }
}
