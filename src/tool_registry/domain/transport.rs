//! How a provider is reached.

use super::ToolRegistryDomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Transport descriptor for a tool provider.
///
/// Serialised with an explicit `kind` tag so stored descriptors stay
/// readable:
///
/// ```json
/// { "kind": "http_sse", "endpoint": "https://tools.example.com/sse" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ProviderTransport {
    /// A local process spoken to over stdin/stdout.
    Stdio {
        /// Executable to launch.
        command: String,
        /// Command-line arguments.
        #[serde(default)]
        args: Vec<String>,
        /// Extra environment variables.
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
    /// A remote server reached over HTTP with server-sent events.
    HttpSse {
        /// Endpoint URL.
        endpoint: String,
    },
}

impl ProviderTransport {
    /// Creates a stdio transport with no arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::EmptyStdioCommand`] when the
    /// command is blank.
    pub fn stdio(command: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        let normalized = command.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(ToolRegistryDomainError::EmptyStdioCommand);
        }
        Ok(Self::Stdio {
            command: normalized,
            args: Vec::new(),
            env: BTreeMap::new(),
        })
    }

    /// Creates an HTTP+SSE transport.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError`] when the endpoint is blank or not
    /// an HTTP URL.
    pub fn http_sse(endpoint: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        let normalized = endpoint.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(ToolRegistryDomainError::EmptyEndpoint);
        }
        if !(normalized.starts_with("http://") || normalized.starts_with("https://")) {
            return Err(ToolRegistryDomainError::InvalidEndpoint(normalized));
        }
        Ok(Self::HttpSse {
            endpoint: normalized,
        })
    }

    /// Replaces the arguments of a stdio transport; other kinds are returned
    /// unchanged.
    #[must_use]
    pub fn with_args(self, values: impl IntoIterator<Item = String>) -> Self {
        match self {
            Self::Stdio { command, env, .. } => Self::Stdio {
                command,
                args: values.into_iter().collect(),
                env,
            },
            other @ Self::HttpSse { .. } => other,
        }
    }

    /// Returns the transport kind in storage form.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Stdio { .. } => "stdio",
            Self::HttpSse { .. } => "http_sse",
        }
    }
}
