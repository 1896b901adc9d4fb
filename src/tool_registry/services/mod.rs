//! Registry services coordinating provider discovery and resolution.

mod registry;

pub use registry::{
    RegistrySnapshot, SyncReport, ToolRegistry, ToolRegistryError, ToolRegistryResult,
};
