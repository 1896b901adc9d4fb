//! Tool invocation.
//!
//! Runs one tool call against a resolved provider: sends the wire envelope,
//! races the response against a deadline and a cancellation token, and
//! retries transport failures for idempotent tools with bounded backoff.
//! Every path ends in an [`InvocationOutcome`](domain::InvocationOutcome);
//! nothing here is fatal to a conversation.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
