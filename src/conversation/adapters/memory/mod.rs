//! In-memory adapters for the conversation ports.

mod conversation_store;
mod turn_store;

pub use conversation_store::InMemoryConversationStore;
pub use turn_store::InMemoryTurnStore;
