//! Conversation metadata aggregate.

use super::{ConversationId, TurnDomainError, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Maximum title length in characters, matching `VARCHAR(200)`.
const MAX_TITLE_CHARS: usize = 200;

/// Number of characters of the first message used for a derived title.
const DERIVED_TITLE_CHARS: usize = 80;

/// Title, ownership and lifecycle metadata for a conversation.
///
/// Turns are stored separately by the turn store; this aggregate carries no
/// ordering semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    title: String,
    owner: UserId,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing persisted conversation metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedConversationData {
    /// Persisted identifier.
    pub id: ConversationId,
    /// Persisted title.
    pub title: String,
    /// Persisted owner.
    pub owner: UserId,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted close timestamp.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Creates open conversation metadata.
    ///
    /// # Errors
    ///
    /// Returns [`TurnDomainError::EmptyTitle`] when the title is blank.
    pub fn new(
        owner: UserId,
        title: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<Self, TurnDomainError> {
        let normalized: String = title.into().trim().chars().take(MAX_TITLE_CHARS).collect();
        if normalized.is_empty() {
            return Err(TurnDomainError::EmptyTitle);
        }
        Ok(Self {
            id: ConversationId::new(),
            title: normalized,
            owner,
            created_at: clock.utc(),
            closed_at: None,
        })
    }

    /// Derives a title from the first user message.
    ///
    /// # Examples
    ///
    /// ```
    /// use turnstile::conversation::domain::Conversation;
    ///
    /// let title = Conversation::title_from_message("  Weather in Paris,\nthen summarize ");
    /// assert_eq!(title, "Weather in Paris, then summarize");
    /// ```
    #[must_use]
    pub fn title_from_message(message: &str) -> String {
        message
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(DERIVED_TITLE_CHARS)
            .collect()
    }

    /// Reconstructs metadata from persistence.
    #[must_use]
    pub fn from_persisted(data: PersistedConversationData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            owner: data.owner,
            created_at: data.created_at,
            closed_at: data.closed_at,
        }
    }

    /// Returns the conversation identifier.
    #[must_use]
    pub const fn id(&self) -> ConversationId {
        self.id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the owning user.
    #[must_use]
    pub const fn owner(&self) -> UserId {
        self.owner
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the close timestamp for soft-closed conversations.
    #[must_use]
    pub const fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// Returns `true` once the conversation has been soft-closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    /// Soft-closes the conversation. Closing twice keeps the first timestamp.
    pub fn close(&mut self, clock: &impl Clock) {
        if self.closed_at.is_none() {
            self.closed_at = Some(clock.utc());
        }
    }
}
