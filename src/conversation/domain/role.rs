//! Turn author roles.

use super::ParseRoleError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Text submitted by the conversation owner.
    User,
    /// Output of the model backend, optionally requesting tool calls.
    Assistant,
    /// The result of one tool call.
    Tool,
}

impl Role {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = ParseRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "tool" => Ok(Self::Tool),
            _ => Err(ParseRoleError(value.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("user", Role::User)]
    #[case(" Assistant ", Role::Assistant)]
    #[case("TOOL", Role::Tool)]
    fn parses_canonical_and_loose_forms(#[case] raw: &str, #[case] expected: Role) {
        assert_eq!(Role::try_from(raw), Ok(expected));
    }

    #[test]
    fn rejects_unknown_role() {
        assert_eq!(
            Role::try_from("system"),
            Err(ParseRoleError("system".to_owned()))
        );
    }
}
