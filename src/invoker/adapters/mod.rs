//! Invoker adapters.

pub mod memory;
