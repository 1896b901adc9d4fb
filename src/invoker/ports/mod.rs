//! Ports consumed by the invoker.

mod transport;

pub use transport::{ToolTransport, TransportError, TransportResult};
