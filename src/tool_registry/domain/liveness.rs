//! Provider reachability as last observed by the registry.

use super::ParseLivenessError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reachability of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    /// Not checked since registration.
    Unknown,
    /// The last capability query succeeded.
    Reachable,
    /// The last capability query failed.
    Unreachable,
}

impl Liveness {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Reachable => "reachable",
            Self::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for Liveness {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Liveness {
    type Error = ParseLivenessError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "reachable" => Ok(Self::Reachable),
            "unreachable" => Ok(Self::Unreachable),
            _ => Err(ParseLivenessError(value.to_owned())),
        }
    }
}

/// Timestamped liveness observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessSnapshot {
    status: Liveness,
    checked_at: DateTime<Utc>,
    message: Option<String>,
}

impl LivenessSnapshot {
    /// Creates an observation with no message.
    #[must_use]
    pub const fn new(status: Liveness, checked_at: DateTime<Utc>) -> Self {
        Self {
            status,
            checked_at,
            message: None,
        }
    }

    /// Creates an `unreachable` observation carrying the failure detail.
    #[must_use]
    pub fn unreachable(checked_at: DateTime<Utc>, message: impl Into<String>) -> Self {
        let detail = message.into().trim().to_owned();
        Self {
            status: Liveness::Unreachable,
            checked_at,
            message: (!detail.is_empty()).then_some(detail),
        }
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> Liveness {
        self.status
    }

    /// Returns when the observation was made.
    #[must_use]
    pub const fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    /// Returns the failure detail, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}
