//! `PostgreSQL` adapters for conversation persistence.

mod conversion;
mod models;
mod repository;
mod schema;

pub use repository::{ConversationPgPool, PostgresConversationStore, PostgresTurnStore};
