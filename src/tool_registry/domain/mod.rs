//! Domain model for tool providers and their capabilities.
//!
//! Providers are identified by id, addressed by a validated name, and carry
//! the tools they advertise together with the registry's last reachability
//! observation. Infrastructure concerns remain outside this boundary.

mod capability;
mod error;
mod ids;
mod liveness;
mod provider;
mod transport;

pub use capability::ToolCapability;
pub use error::{ParseLivenessError, ToolRegistryDomainError};
pub use ids::{ProviderId, ProviderName};
pub use liveness::{Liveness, LivenessSnapshot};
pub use provider::{PersistedProviderData, ToolProvider};
pub use transport::ProviderTransport;
