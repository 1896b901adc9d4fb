//! Ports consumed by the orchestrator.

mod model;

#[cfg(test)]
pub use model::MockModelBackend;
pub use model::{ModelBackend, ModelBackendError, ModelBackendResult};
