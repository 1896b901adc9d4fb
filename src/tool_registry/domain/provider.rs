//! Tool provider aggregate.

use super::{
    Liveness, LivenessSnapshot, ProviderId, ProviderName, ProviderTransport, ToolCapability,
    ToolRegistryDomainError,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An external server exposing callable tools.
///
/// Providers are shared, read-mostly values. Registry updates replace a
/// provider wholesale rather than mutating a shared instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolProvider {
    id: ProviderId,
    name: ProviderName,
    transport: ProviderTransport,
    capabilities: Vec<ToolCapability>,
    liveness: LivenessSnapshot,
    registered_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedProviderData {
    /// Persisted identifier.
    pub id: ProviderId,
    /// Persisted name.
    pub name: ProviderName,
    /// Persisted transport descriptor.
    pub transport: ProviderTransport,
    /// Persisted capability list.
    pub capabilities: Vec<ToolCapability>,
    /// Persisted liveness observation.
    pub liveness: LivenessSnapshot,
    /// Persisted registration timestamp.
    pub registered_at: DateTime<Utc>,
}

fn ensure_unique(
    provider_id: ProviderId,
    capabilities: &[ToolCapability],
) -> Result<(), ToolRegistryDomainError> {
    let mut seen = HashSet::with_capacity(capabilities.len());
    for capability in capabilities {
        if !seen.insert(capability.name()) {
            return Err(ToolRegistryDomainError::DuplicateCapability {
                provider_id,
                tool_name: capability.name().to_owned(),
            });
        }
    }
    Ok(())
}

impl ToolProvider {
    /// Creates a provider with unknown liveness.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::DuplicateCapability`] when a tool
    /// name repeats.
    pub fn new(
        name: ProviderName,
        transport: ProviderTransport,
        capabilities: Vec<ToolCapability>,
        clock: &impl Clock,
    ) -> Result<Self, ToolRegistryDomainError> {
        let id = ProviderId::new();
        ensure_unique(id, &capabilities)?;
        let timestamp = clock.utc();
        Ok(Self {
            id,
            name,
            transport,
            capabilities,
            liveness: LivenessSnapshot::new(Liveness::Unknown, timestamp),
            registered_at: timestamp,
        })
    }

    /// Reconstructs a provider from persistence.
    #[must_use]
    pub fn from_persisted(data: PersistedProviderData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            transport: data.transport,
            capabilities: data.capabilities,
            liveness: data.liveness,
            registered_at: data.registered_at,
        }
    }

    /// Returns the provider identifier.
    #[must_use]
    pub const fn id(&self) -> ProviderId {
        self.id
    }

    /// Returns the provider name.
    #[must_use]
    pub const fn name(&self) -> &ProviderName {
        &self.name
    }

    /// Returns the transport descriptor.
    #[must_use]
    pub const fn transport(&self) -> &ProviderTransport {
        &self.transport
    }

    /// Returns the advertised tools.
    #[must_use]
    pub fn capabilities(&self) -> &[ToolCapability] {
        &self.capabilities
    }

    /// Finds an advertised tool by name.
    #[must_use]
    pub fn capability(&self, tool_name: &str) -> Option<&ToolCapability> {
        self.capabilities
            .iter()
            .find(|capability| capability.name() == tool_name)
    }

    /// Returns the last liveness observation.
    #[must_use]
    pub const fn liveness(&self) -> &LivenessSnapshot {
        &self.liveness
    }

    /// Returns `false` only when the provider is known to be unreachable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.liveness.status() != Liveness::Unreachable
    }

    /// Returns the registration timestamp.
    #[must_use]
    pub const fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    /// Returns a copy with a fresh capability list and `reachable` liveness.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::DuplicateCapability`] when a tool
    /// name repeats.
    pub fn with_refreshed_capabilities(
        &self,
        capabilities: Vec<ToolCapability>,
        clock: &impl Clock,
    ) -> Result<Self, ToolRegistryDomainError> {
        ensure_unique(self.id, &capabilities)?;
        Ok(Self {
            capabilities,
            liveness: LivenessSnapshot::new(Liveness::Reachable, clock.utc()),
            ..self.clone()
        })
    }

    /// Returns a copy marked unreachable; capabilities are kept so calls
    /// still resolve and then fail explicitly.
    #[must_use]
    pub fn marked_unreachable(&self, message: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            liveness: LivenessSnapshot::unreachable(clock.utc(), message),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockable::DefaultClock;

    fn capability(name: &str) -> ToolCapability {
        ToolCapability::new(name, "test tool").expect("valid capability")
    }

    fn provider(capabilities: Vec<ToolCapability>) -> Result<ToolProvider, ToolRegistryDomainError> {
        ToolProvider::new(
            ProviderName::new("weather").expect("valid name"),
            ProviderTransport::stdio("weather-mcp").expect("valid transport"),
            capabilities,
            &DefaultClock,
        )
    }

    #[test]
    fn repeated_tool_names_are_rejected() {
        let result = provider(vec![capability("get_weather"), capability("get_weather")]);
        assert!(matches!(
            result,
            Err(ToolRegistryDomainError::DuplicateCapability { ref tool_name, .. })
                if tool_name == "get_weather"
        ));
    }

    #[test]
    fn unreachable_provider_keeps_capabilities() {
        let original = provider(vec![capability("get_weather")]).expect("valid provider");

        let marked = original.marked_unreachable("connection refused", &DefaultClock);

        assert!(!marked.is_available());
        assert!(marked.capability("get_weather").is_some());
        assert_eq!(marked.liveness().message(), Some("connection refused"));
        assert_eq!(marked.id(), original.id());
    }

    #[test]
    fn refresh_restores_availability() {
        let original = provider(vec![capability("get_weather")])
            .expect("valid provider")
            .marked_unreachable("down", &DefaultClock);

        let refreshed = original
            .with_refreshed_capabilities(
                vec![capability("get_weather"), capability("get_forecast")],
                &DefaultClock,
            )
            .expect("unique capabilities");

        assert!(refreshed.is_available());
        assert_eq!(refreshed.liveness().status(), Liveness::Reachable);
        assert_eq!(refreshed.capabilities().len(), 2);
    }
}
