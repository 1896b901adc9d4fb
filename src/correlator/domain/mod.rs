//! Round and anomaly types.

mod anomaly;
mod error;
mod round;

pub use anomaly::{AnomalyKind, CorrelationAnomaly};
pub use error::CorrelatorDomainError;
pub use round::{Resolution, RoundId, RoundState, ToolRound};
