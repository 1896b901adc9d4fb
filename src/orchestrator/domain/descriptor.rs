//! Caller-facing error summary.

use serde::Serialize;

/// Stable description of a failed orchestrator call.
///
/// `recoverable` is `true` when the conversation is still valid and
/// resubmitting may succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDescriptor {
    /// Taxonomy name, such as `ConflictError` or `ModelUnavailableError`.
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Whether the caller may retry.
    pub recoverable: bool,
}
