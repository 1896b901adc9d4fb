//! Lazy, restartable cursor over a range of turns.

use super::{TurnStore, TurnStoreResult};
use crate::conversation::domain::{ConversationId, SequenceNumber, Turn, TurnRange};
use std::collections::VecDeque;

/// Pages through a conversation log on demand.
///
/// The cursor is finite: when the range has no upper bound, the head
/// observed on the first fetch becomes the bound, so turns appended while
/// reading are not chased. [`TurnCursor::restart`] rewinds to the start of
/// the range and re-captures the bound.
pub struct TurnCursor<'a, S: TurnStore> {
    store: &'a S,
    conversation_id: ConversationId,
    range: TurnRange,
    page_size: usize,
    next: SequenceNumber,
    bound: Option<SequenceNumber>,
    started: bool,
    exhausted: bool,
    buffer: VecDeque<Turn>,
}

impl<'a, S: TurnStore> TurnCursor<'a, S> {
    /// Creates a cursor; nothing is read until the first call to
    /// [`TurnCursor::next_turn`].
    #[must_use]
    pub fn new(
        store: &'a S,
        conversation_id: ConversationId,
        range: TurnRange,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            conversation_id,
            range,
            page_size: page_size.max(1),
            next: range.start(),
            bound: range.end(),
            started: false,
            exhausted: false,
            buffer: VecDeque::new(),
        }
    }

    /// Returns the next turn in range, or `None` once the range is drained.
    ///
    /// # Errors
    ///
    /// Propagates store failures; the cursor may be retried afterwards.
    pub async fn next_turn(&mut self) -> TurnStoreResult<Option<Turn>> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }
        Ok(self.buffer.pop_front())
    }

    /// Rewinds the cursor to the start of its range.
    pub fn restart(&mut self) {
        self.next = self.range.start();
        self.bound = self.range.end();
        self.started = false;
        self.exhausted = false;
        self.buffer.clear();
    }

    /// Drains the remaining turns into a vector.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn collect_all(mut self) -> TurnStoreResult<Vec<Turn>> {
        let mut turns = Vec::new();
        while let Some(turn) = self.next_turn().await? {
            turns.push(turn);
        }
        Ok(turns)
    }

    async fn fetch_page(&mut self) -> TurnStoreResult<()> {
        if !self.started {
            self.started = true;
            if self.bound.is_none() {
                self.bound = self.store.head(self.conversation_id).await?;
            }
        }

        let Some(bound) = self.bound else {
            self.exhausted = true;
            return Ok(());
        };
        if self.next > bound {
            self.exhausted = true;
            return Ok(());
        }

        let page = self
            .store
            .read_page(self.conversation_id, self.next, self.page_size)
            .await?;
        if page.len() < self.page_size {
            self.exhausted = true;
        }

        for turn in page {
            if turn.sequence_number() > bound {
                self.exhausted = true;
                break;
            }
            self.next = turn.sequence_number().next();
            self.buffer.push_back(turn);
        }
        Ok(())
    }
}
