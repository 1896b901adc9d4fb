//! Adapter implementations for provider discovery ports.

pub mod memory;
pub mod postgres;
