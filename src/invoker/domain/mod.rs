//! Invocation domain: the provider wire contract, per-call state and
//! outcomes.

mod config;
mod envelope;
mod invocation;
mod outcome;

pub use config::{DEFAULT_TOOL_TIMEOUT, InvokerConfig, InvokerConfigError};
pub use envelope::{ToolCallEnvelope, ToolResponse};
pub use invocation::{InvocationState, ToolInvocation};
pub use outcome::InvocationOutcome;
