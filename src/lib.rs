//! Turnstile: conversation and tool-call orchestration for agentic chat.
//!
//! A conversation is an append-only log of turns. When the model asks for
//! tools, the engine resolves each call against a registry of providers,
//! runs the calls concurrently under deadlines, records every result in the
//! log, and hands the updated history back to the model until it produces a
//! final answer.
//!
//! # Architecture
//!
//! Each module follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, in-memory)
//! - **Services**: Coordination of domain logic over ports
//!
//! # Modules
//!
//! - [`conversation`]: Turn log, tool call ledger, and conversation metadata
//! - [`tool_registry`]: Tool providers and name resolution
//! - [`invoker`]: Deadline-bound tool invocation with retries
//! - [`correlator`]: Matching tool results to their round
//! - [`orchestrator`]: The think, act, observe cycle
//! - [`retry`]: Shared backoff policy

pub mod conversation;
pub mod correlator;
pub mod invoker;
pub mod orchestrator;
pub mod retry;
pub mod tool_registry;
