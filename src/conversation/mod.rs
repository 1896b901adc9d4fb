//! The conversation log.
//!
//! A conversation is an append-only, strictly ordered sequence of turns.
//! Sequence numbers are assigned by the store at commit time, and every
//! append declares the head it expects so concurrent writers are detected
//! instead of interleaved. Tool call bookkeeping lives alongside the log:
//! each tool turn must answer exactly one earlier, still-pending request.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Shared append workflow in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod tests;
