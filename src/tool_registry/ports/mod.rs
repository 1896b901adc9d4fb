//! Port contracts for provider discovery and tool resolution.

mod capability_source;
mod directory;
mod resolver;

pub use capability_source::{CapabilitySource, CapabilitySourceError, CapabilitySourceResult};
pub use directory::{ProviderDirectory, ProviderDirectoryError, ProviderDirectoryResult};
pub use resolver::{ResolveError, ToolResolver};
