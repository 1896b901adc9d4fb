//! Shared world state for conversation loop BDD scenarios.

use crate::loop_support::{LoopStack, default_config, stack};
use rstest::fixture;
use turnstile::conversation::domain::{Conversation, Turn};
use turnstile::orchestrator::domain::OrchestratorConfig;
use turnstile::orchestrator::services::OrchestratorResult;

/// Scenario world for conversation loop behaviour tests.
pub struct LoopWorld {
    /// Orchestrator and scripted adapters.
    pub stack: LoopStack,
    /// Settings the stack was built with.
    pub config: OrchestratorConfig,
    /// Counter for generated call identifiers.
    pub next_call: usize,
    /// Conversation started by the scenario.
    pub conversation: Option<Conversation>,
    /// Result of the last user message.
    pub last_reply: Option<OrchestratorResult<Turn>>,
}

impl LoopWorld {
    /// Creates a world with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(default_config())
    }

    /// Creates a world with the given settings.
    #[must_use]
    pub fn with_config(config: OrchestratorConfig) -> Self {
        Self {
            stack: stack(config),
            config,
            next_call: 0,
            conversation: None,
            last_reply: None,
        }
    }

    /// Returns a fresh call identifier.
    pub fn call_id(&mut self, tool: &str) -> String {
        self.next_call = self.next_call.saturating_add(1);
        format!("{tool}-{}", self.next_call)
    }
}

impl Default for LoopWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> LoopWorld {
    LoopWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
