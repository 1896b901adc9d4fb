//! Port contracts for the conversation log and its metadata.

mod cursor;
mod metadata;
mod turn_store;

pub use cursor::TurnCursor;
pub use metadata::{ConversationMetadataStore, MetadataStoreError, MetadataStoreResult};
pub use turn_store::{DEFAULT_PAGE_SIZE, TurnStore, TurnStoreError, TurnStoreResult};
