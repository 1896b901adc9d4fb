//! Diesel row models for conversation persistence.

use super::schema::{conversations, turns};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for conversation metadata.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = conversations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ConversationRow {
    /// Internal conversation identifier.
    pub id: uuid::Uuid,
    /// Display title.
    pub title: String,
    /// Owning user.
    pub owner_id: uuid::Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Close timestamp.
    pub closed_at: Option<DateTime<Utc>>,
}

/// Insert and update model for conversation metadata.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = conversations)]
#[diesel(treat_none_as_null = true)]
pub struct NewConversationRow {
    /// Internal conversation identifier.
    pub id: uuid::Uuid,
    /// Display title.
    pub title: String,
    /// Owning user.
    pub owner_id: uuid::Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Close timestamp.
    pub closed_at: Option<DateTime<Utc>>,
}

/// Query result row for turns.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = turns)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TurnRow {
    /// Internal turn identifier.
    pub id: uuid::Uuid,
    /// Owning conversation.
    pub conversation_id: uuid::Uuid,
    /// Position in the log.
    pub sequence_number: i64,
    /// Author role.
    pub role: String,
    /// Text content.
    pub content: String,
    /// Tool call requests as JSON.
    pub tool_calls: Value,
    /// Answered call identifier.
    pub tool_call_id: Option<String>,
    /// Tool result as JSON.
    pub result: Option<Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for turns.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = turns)]
pub struct NewTurnRow {
    /// Internal turn identifier.
    pub id: uuid::Uuid,
    /// Owning conversation.
    pub conversation_id: uuid::Uuid,
    /// Position in the log.
    pub sequence_number: i64,
    /// Author role.
    pub role: String,
    /// Text content.
    pub content: String,
    /// Tool call requests as JSON.
    pub tool_calls: Value,
    /// Answered call identifier.
    pub tool_call_id: Option<String>,
    /// Tool result as JSON.
    pub result: Option<Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
