//! Adapter implementations for the turn store and metadata ports.

pub mod memory;
pub mod postgres;
