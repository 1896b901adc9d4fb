//! `PostgreSQL` turn store and metadata store.

use super::{
    conversion::{
        conversation_to_row, row_to_conversation, row_to_turn, sequence_to_column,
        turn_to_new_row,
    },
    models::{ConversationRow, TurnRow},
    schema::{conversations, turns},
};
use crate::conversation::{
    domain::{
        Conversation, ConversationId, SequenceNumber, ToolCallId, ToolCallLedger,
        ToolCallRequest, Turn, TurnDraft,
    },
    ports::{
        ConversationMetadataStore, MetadataStoreError, MetadataStoreResult, TurnStore,
        TurnStoreError, TurnStoreResult,
    },
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by conversation adapters.
pub type ConversationPgPool = Pool<ConnectionManager<PgConnection>>;

impl From<DieselError> for TurnStoreError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

/// `PostgreSQL`-backed turn store.
///
/// Each append runs in one transaction that compares the declared
/// predecessor with the stored head, checks the tool call ledger, and
/// inserts the turn. Concurrent writers racing for the same sequence number
/// are caught by the `(conversation_id, sequence_number)` unique constraint
/// and reported as [`TurnStoreError::Conflict`].
#[derive(Debug, Clone)]
pub struct PostgresTurnStore {
    pool: ConversationPgPool,
}

impl PostgresTurnStore {
    /// Creates a store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: ConversationPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TurnStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TurnStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TurnStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TurnStoreError::persistence)?
    }
}

#[async_trait]
impl TurnStore for PostgresTurnStore {
    async fn append(&self, draft: TurnDraft) -> TurnStoreResult<Turn> {
        draft.validate()?;
        self.run_blocking(move |connection| {
            connection.transaction::<_, TurnStoreError, _>(|tx| append_in_transaction(tx, draft))
        })
        .await
    }

    async fn head(
        &self,
        conversation_id: ConversationId,
    ) -> TurnStoreResult<Option<SequenceNumber>> {
        self.run_blocking(move |connection| load_head(connection, conversation_id))
            .await
    }

    async fn read_page(
        &self,
        conversation_id: ConversationId,
        from: SequenceNumber,
        limit: usize,
    ) -> TurnStoreResult<Vec<Turn>> {
        let start = sequence_to_column(from)?;
        let page_limit = i64::try_from(limit).map_err(TurnStoreError::persistence)?;
        self.run_blocking(move |connection| {
            let rows = turns::table
                .filter(turns::conversation_id.eq(conversation_id.into_inner()))
                .filter(turns::sequence_number.ge(start))
                .order(turns::sequence_number.asc())
                .limit(page_limit)
                .select(TurnRow::as_select())
                .load::<TurnRow>(connection)?;
            rows.into_iter().map(row_to_turn).collect()
        })
        .await
    }

    async fn find_pending_tool_call(
        &self,
        conversation_id: ConversationId,
        tool_call_id: &ToolCallId,
    ) -> TurnStoreResult<Option<ToolCallRequest>> {
        let lookup = tool_call_id.clone();
        self.run_blocking(move |connection| {
            let ledger = load_ledger(connection, conversation_id)?;
            Ok(ledger.find_pending(&lookup).cloned())
        })
        .await
    }

    async fn pending_tool_calls(
        &self,
        conversation_id: ConversationId,
    ) -> TurnStoreResult<Vec<ToolCallRequest>> {
        self.run_blocking(move |connection| {
            let ledger = load_ledger(connection, conversation_id)?;
            Ok(ledger.pending())
        })
        .await
    }

    async fn delete_conversation(&self, conversation_id: ConversationId) -> TurnStoreResult<()> {
        self.run_blocking(move |connection| {
            diesel::delete(
                turns::table.filter(turns::conversation_id.eq(conversation_id.into_inner())),
            )
            .execute(connection)?;
            Ok(())
        })
        .await
    }
}

fn append_in_transaction(connection: &mut PgConnection, draft: TurnDraft) -> TurnStoreResult<Turn> {
    let conversation_id = draft.conversation_id();
    let actual = load_head(connection, conversation_id)?;
    if draft.predecessor() != actual {
        return Err(TurnStoreError::Conflict {
            conversation_id,
            expected: draft.predecessor(),
            actual,
        });
    }

    if !draft.tool_calls().is_empty() || draft.tool_call_id().is_some() {
        load_ledger(connection, conversation_id)?.check(&draft)?;
    } else {
        ToolCallLedger::new().check(&draft)?;
    }

    let turn = draft.commit(SequenceNumber::after(actual));
    let new_row = turn_to_new_row(&turn)?;
    diesel::insert_into(turns::table)
        .values(&new_row)
        .execute(connection)
        .map_err(|err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                if is_sequence_unique_violation(info.as_ref()) =>
            {
                TurnStoreError::Conflict {
                    conversation_id,
                    expected: actual,
                    actual: Some(turn.sequence_number()),
                }
            }
            _ => TurnStoreError::persistence(err),
        })?;
    Ok(turn)
}

fn load_head(
    connection: &mut PgConnection,
    conversation_id: ConversationId,
) -> TurnStoreResult<Option<SequenceNumber>> {
    let max = turns::table
        .filter(turns::conversation_id.eq(conversation_id.into_inner()))
        .select(diesel::dsl::max(turns::sequence_number))
        .first::<Option<i64>>(connection)?;
    max.map(|value| {
        u64::try_from(value)
            .map(SequenceNumber::new)
            .map_err(TurnStoreError::invalid_persisted_data)
    })
    .transpose()
}

fn load_ledger(
    connection: &mut PgConnection,
    conversation_id: ConversationId,
) -> TurnStoreResult<ToolCallLedger> {
    let rows = turns::table
        .filter(turns::conversation_id.eq(conversation_id.into_inner()))
        .filter(
            turns::tool_call_id
                .is_not_null()
                .or(turns::role.eq("assistant")),
        )
        .order(turns::sequence_number.asc())
        .select(TurnRow::as_select())
        .load::<TurnRow>(connection)?;
    let history = rows
        .into_iter()
        .map(row_to_turn)
        .collect::<TurnStoreResult<Vec<_>>>()?;
    Ok(ToolCallLedger::from_turns(&history))
}

fn is_sequence_unique_violation(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == "idx_turns_conversation_sequence")
}

/// `PostgreSQL`-backed conversation metadata store.
#[derive(Debug, Clone)]
pub struct PostgresConversationStore {
    pool: ConversationPgPool,
}

impl PostgresConversationStore {
    /// Creates a store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: ConversationPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> MetadataStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> MetadataStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(MetadataStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(MetadataStoreError::persistence)?
    }
}

#[async_trait]
impl ConversationMetadataStore for PostgresConversationStore {
    async fn create(&self, conversation: &Conversation) -> MetadataStoreResult<()> {
        let conversation_id = conversation.id();
        let new_row = conversation_to_row(conversation);
        self.run_blocking(move |connection| {
            diesel::insert_into(conversations::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        MetadataStoreError::DuplicateConversation(conversation_id)
                    }
                    _ => MetadataStoreError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(
        &self,
        conversation_id: ConversationId,
    ) -> MetadataStoreResult<Option<Conversation>> {
        self.run_blocking(move |connection| {
            let row = conversations::table
                .filter(conversations::id.eq(conversation_id.into_inner()))
                .select(ConversationRow::as_select())
                .first::<ConversationRow>(connection)
                .optional()
                .map_err(MetadataStoreError::persistence)?;
            row.map(row_to_conversation).transpose()
        })
        .await
    }

    async fn update(&self, conversation: &Conversation) -> MetadataStoreResult<()> {
        let conversation_id = conversation.id();
        let changes = conversation_to_row(conversation);
        self.run_blocking(move |connection| {
            let updated = diesel::update(
                conversations::table.filter(conversations::id.eq(conversation_id.into_inner())),
            )
            .set(&changes)
            .execute(connection)
            .map_err(MetadataStoreError::persistence)?;
            if updated == 0 {
                return Err(MetadataStoreError::NotFound(conversation_id));
            }
            Ok(())
        })
        .await
    }
}
