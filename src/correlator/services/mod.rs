//! Correlation workflow.

mod correlator;

pub use correlator::{CorrelatorError, CorrelatorResult, TurnCorrelator};

#[cfg(test)]
mod tests;
