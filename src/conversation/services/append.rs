//! Optimistic append with a single conflict retry.

use crate::conversation::{
    domain::{SequenceNumber, Turn, TurnDraft},
    ports::{TurnStore, TurnStoreResult},
};
use tracing::warn;

/// Appends `draft` after `expected_head`.
///
/// On a [`Conflict`](crate::conversation::ports::TurnStoreError::Conflict)
/// the head is re-read and the append is tried exactly once more; a second
/// conflict is returned to the caller.
///
/// # Errors
///
/// Returns the store error of the final attempt.
pub async fn append_with_retry<S>(
    store: &S,
    draft: TurnDraft,
    expected_head: Option<SequenceNumber>,
) -> TurnStoreResult<Turn>
where
    S: TurnStore + ?Sized,
{
    let conversation_id = draft.conversation_id();
    match store.append(draft.clone().after(expected_head)).await {
        Err(err) if err.is_conflict() => {
            let head = store.head(conversation_id).await?;
            warn!(
                conversation_id = %conversation_id,
                expected = ?expected_head.map(|seq| seq.value()),
                actual = ?head.map(|seq| seq.value()),
                "turn_append_conflict"
            );
            store.append(draft.after(head)).await
        }
        result => result,
    }
}
