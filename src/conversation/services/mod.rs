//! Workflows shared by the components that write to the turn log.

mod append;

pub use append::append_with_retry;
