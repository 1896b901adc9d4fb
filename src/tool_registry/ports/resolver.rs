//! Read side of the registry used by the invoker and orchestrator.

use crate::tool_registry::domain::{ProviderId, ProviderName, ToolCapability, ToolProvider};
use std::sync::Arc;
use thiserror::Error;

/// Snapshot-consistent tool lookup.
///
/// Every method reads one immutable snapshot, so a lookup never observes a
/// half-applied registration.
pub trait ToolResolver: Send + Sync {
    /// Finds the single provider offering `tool_name`.
    ///
    /// Providers marked unreachable still resolve; callers decide how to
    /// fail.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Unknown`] when no provider offers the tool
    /// and [`ResolveError::Ambiguous`] when more than one does.
    fn resolve(&self, tool_name: &str) -> Result<Arc<ToolProvider>, ResolveError>;

    /// Returns the current registration of a provider, if still registered.
    fn current(&self, provider_id: ProviderId) -> Option<Arc<ToolProvider>>;

    /// Returns every advertised tool across all providers.
    fn capabilities(&self) -> Vec<ToolCapability>;
}

/// Resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No registered provider offers the tool.
    #[error("no provider offers tool '{0}'")]
    Unknown(String),

    /// More than one registered provider offers the tool.
    #[error("tool '{tool_name}' is offered by several providers: {providers:?}")]
    Ambiguous {
        /// Requested tool.
        tool_name: String,
        /// Every provider offering it, ordered by name.
        providers: Vec<ProviderName>,
    },
}
