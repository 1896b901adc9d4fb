//! Conversation loop services.

mod error;
mod orchestrator;
mod session;

pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::{ConversationOrchestrator, RecoveryReport};
