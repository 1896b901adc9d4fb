//! Diesel row model for provider descriptors.

use super::schema::tool_providers;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for provider descriptors.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tool_providers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ToolProviderRow {
    /// Provider identifier.
    pub id: uuid::Uuid,
    /// Unique provider name.
    pub name: String,
    /// Transport descriptor.
    pub transport: Value,
    /// Advertised capabilities.
    pub capabilities: Value,
    /// Whether the provider is active.
    pub active: bool,
    /// Liveness status.
    pub liveness: String,
    /// Liveness detail.
    pub liveness_message: Option<String>,
    /// Liveness observation time.
    pub liveness_checked_at: DateTime<Utc>,
    /// Registration timestamp.
    pub registered_at: DateTime<Utc>,
}
