//! In-memory provider directory and capability source.

mod capability_source;
mod directory;

pub use capability_source::InMemoryCapabilitySource;
pub use directory::InMemoryProviderDirectory;
