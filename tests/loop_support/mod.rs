//! Shared in-memory stack for conversation loop tests.

use std::sync::Arc;
use std::time::Duration;

use mockable::DefaultClock;
use turnstile::conversation::adapters::memory::{InMemoryConversationStore, InMemoryTurnStore};
use turnstile::conversation::domain::ToolCallId;
use turnstile::invoker::adapters::memory::ScriptedToolTransport;
use turnstile::invoker::domain::InvokerConfig;
use turnstile::invoker::services::ToolInvoker;
use turnstile::orchestrator::adapters::memory::ScriptedModelBackend;
use turnstile::orchestrator::domain::OrchestratorConfig;
use turnstile::orchestrator::services::ConversationOrchestrator;
use turnstile::retry::RetryPolicy;
use turnstile::tool_registry::adapters::memory::InMemoryCapabilitySource;
use turnstile::tool_registry::domain::{
    ProviderName, ProviderTransport, ToolCapability, ToolProvider,
};
use turnstile::tool_registry::services::ToolRegistry;

/// Registry type used by the loop tests.
pub type TestRegistry = ToolRegistry<InMemoryCapabilitySource, DefaultClock>;

/// Orchestrator wired to in-memory adapters.
pub type TestOrchestrator = ConversationOrchestrator<
    InMemoryTurnStore,
    InMemoryConversationStore,
    ScriptedModelBackend,
    ScriptedToolTransport,
    TestRegistry,
    DefaultClock,
>;

/// Handles to every adapter behind a [`TestOrchestrator`].
pub struct LoopStack {
    pub store: Arc<InMemoryTurnStore>,
    pub metadata: Arc<InMemoryConversationStore>,
    pub model: Arc<ScriptedModelBackend>,
    pub transport: Arc<ScriptedToolTransport>,
    pub registry: Arc<TestRegistry>,
    pub orchestrator: Arc<TestOrchestrator>,
}

/// Builds a stack with the given orchestrator settings.
///
/// # Panics
///
/// Panics when the configuration is invalid.
#[must_use]
pub fn stack(config: OrchestratorConfig) -> LoopStack {
    stack_over(
        Arc::new(InMemoryTurnStore::new()),
        Arc::new(InMemoryConversationStore::new()),
        config,
    )
}

/// Builds a stack over existing stores, as a restarted process would.
///
/// # Panics
///
/// Panics when the configuration is invalid.
#[must_use]
pub fn stack_over(
    store: Arc<InMemoryTurnStore>,
    metadata: Arc<InMemoryConversationStore>,
    config: OrchestratorConfig,
) -> LoopStack {
    let model = Arc::new(ScriptedModelBackend::new());
    let transport = Arc::new(ScriptedToolTransport::new());
    let registry = Arc::new(ToolRegistry::new(
        Arc::new(InMemoryCapabilitySource::new()),
        Arc::new(DefaultClock),
    ));
    let invoker = Arc::new(ToolInvoker::new(
        Arc::clone(&transport),
        Arc::clone(&registry),
        InvokerConfig::default().with_retry(RetryPolicy::none()),
    ));
    let orchestrator = ConversationOrchestrator::new(
        Arc::clone(&store),
        Arc::clone(&metadata),
        Arc::clone(&model),
        invoker,
        Arc::new(DefaultClock),
        config.with_model_retry(RetryPolicy::none()),
    )
    .expect("valid orchestrator config");
    LoopStack {
        store,
        metadata,
        model,
        transport,
        registry,
        orchestrator: Arc::new(orchestrator),
    }
}

/// Default settings with a ten second tool deadline.
#[must_use]
pub fn default_config() -> OrchestratorConfig {
    OrchestratorConfig::default().with_tool_timeout(Duration::from_secs(10))
}

/// Registers a stdio provider offering `tools`.
///
/// # Panics
///
/// Panics when a name is invalid or already registered.
pub fn register_provider(stack: &LoopStack, name: &str, tools: &[&str]) {
    let capabilities = tools
        .iter()
        .map(|tool| ToolCapability::new(*tool, "test tool").expect("valid capability"))
        .collect();
    let provider = ToolProvider::new(
        ProviderName::new(name).expect("valid provider name"),
        ProviderTransport::stdio(format!("{name}-mcp")).expect("valid transport"),
        capabilities,
        &DefaultClock,
    )
    .expect("valid provider");
    stack.registry.register(provider).expect("register provider");
}

/// Parses a call identifier.
///
/// # Panics
///
/// Panics on a blank identifier.
#[must_use]
pub fn call_id(raw: &str) -> ToolCallId {
    ToolCallId::new(raw).expect("valid call id")
}
