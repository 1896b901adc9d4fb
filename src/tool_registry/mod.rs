//! Tool registry: which provider serves which tool.
//!
//! Providers are registered from a directory, queried for their current tool
//! list, and resolved by tool name. The registry is shared, read-mostly
//! state held as an immutable snapshot that writers replace whole, so a
//! resolution is always consistent with one registration state.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Registry service in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
