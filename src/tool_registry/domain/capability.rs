//! Tool capability descriptor advertised by a provider.

use super::ToolRegistryDomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One callable tool offered by a provider.
///
/// `idempotent` declares that repeating a call has no additional side
/// effects; only idempotent tools are retried after transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCapability {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "empty_object_schema")]
    input_schema: Value,
    #[serde(default)]
    idempotent: bool,
}

fn empty_object_schema() -> Value {
    Value::Object(serde_json::Map::new())
}

impl ToolCapability {
    /// Creates a non-idempotent capability with an empty input schema.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::EmptyToolName`] when the name is
    /// blank.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, ToolRegistryDomainError> {
        let normalized_name = name.into().trim().to_owned();
        if normalized_name.is_empty() {
            return Err(ToolRegistryDomainError::EmptyToolName);
        }
        Ok(Self {
            name: normalized_name,
            description: description.into().trim().to_owned(),
            input_schema: empty_object_schema(),
            idempotent: false,
        })
    }

    /// Sets the JSON schema for arguments.
    #[must_use]
    pub fn with_input_schema(mut self, input_schema: Value) -> Self {
        self.input_schema = input_schema;
        self
    }

    /// Marks the tool as safe to repeat.
    #[must_use]
    pub const fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description shown to the model.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the argument schema.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Returns `true` when repeated calls are safe.
    #[must_use]
    pub const fn is_idempotent(&self) -> bool {
        self.idempotent
    }
}
