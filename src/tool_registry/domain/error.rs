//! Error types for tool provider validation and parsing.

use super::ProviderId;
use thiserror::Error;

/// Errors returned while constructing tool registry domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolRegistryDomainError {
    /// The provider name is empty after trimming.
    #[error("provider name must not be empty")]
    EmptyProviderName,

    /// The provider name contains characters outside `[a-z0-9_-]`.
    #[error("provider name '{0}' may only contain lowercase letters, digits, '_' and '-'")]
    InvalidProviderName(String),

    /// The provider name exceeds the storage limit.
    #[error("provider name exceeds 100 character limit: {0}")]
    ProviderNameTooLong(String),

    /// A stdio transport names no command.
    #[error("stdio command must not be empty")]
    EmptyStdioCommand,

    /// An HTTP+SSE transport has no endpoint.
    #[error("HTTP+SSE endpoint must not be empty")]
    EmptyEndpoint,

    /// An HTTP+SSE endpoint is not an `http://` or `https://` URL.
    #[error("HTTP+SSE endpoint '{0}' must start with 'http://' or 'https://'")]
    InvalidEndpoint(String),

    /// A capability has no name.
    #[error("tool capability name must not be empty")]
    EmptyToolName,

    /// A provider lists the same tool twice.
    #[error("provider {provider_id} lists tool '{tool_name}' more than once")]
    DuplicateCapability {
        /// Provider that listed the tool.
        provider_id: ProviderId,
        /// Repeated tool name.
        tool_name: String,
    },
}

/// Error returned while parsing liveness from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown provider liveness: {0}")]
pub struct ParseLivenessError(pub String);
