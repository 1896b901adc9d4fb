//! Invocation workflow.

mod invoker;

pub use invoker::ToolInvoker;

#[cfg(test)]
mod tests;
