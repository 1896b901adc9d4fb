//! Orchestrator adapters.

pub mod memory;
