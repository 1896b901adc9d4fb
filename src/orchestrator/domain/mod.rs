//! Orchestrator domain: state machine, configuration and model replies.

mod config;
mod descriptor;
mod reply;
mod state;

pub use config::{OrchestratorConfig, OrchestratorConfigError, RecoveryPolicy};
pub use descriptor::ErrorDescriptor;
pub use reply::{ModelReply, ProposedToolCall};
pub use state::ConversationState;
