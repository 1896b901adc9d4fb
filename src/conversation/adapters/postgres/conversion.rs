//! Row conversions between Diesel models and conversation domain types.

use super::models::{ConversationRow, NewConversationRow, NewTurnRow, TurnRow};
use crate::conversation::{
    domain::{
        Conversation, ConversationId, PersistedConversationData, PersistedTurnData, Role,
        SequenceNumber, ToolCallId, ToolCallRequest, ToolResult, Turn, TurnId, UserId,
    },
    ports::{MetadataStoreError, MetadataStoreResult, TurnStoreError, TurnStoreResult},
};

pub(super) fn sequence_to_column(sequence: SequenceNumber) -> TurnStoreResult<i64> {
    i64::try_from(sequence.value()).map_err(TurnStoreError::persistence)
}

pub(super) fn turn_to_new_row(turn: &Turn) -> TurnStoreResult<NewTurnRow> {
    let tool_calls =
        serde_json::to_value(turn.tool_calls()).map_err(TurnStoreError::persistence)?;
    let result = turn
        .result()
        .map(serde_json::to_value)
        .transpose()
        .map_err(TurnStoreError::persistence)?;

    Ok(NewTurnRow {
        id: turn.id().into_inner(),
        conversation_id: turn.conversation_id().into_inner(),
        sequence_number: sequence_to_column(turn.sequence_number())?,
        role: turn.role().as_str().to_owned(),
        content: turn.content().to_owned(),
        tool_calls,
        tool_call_id: turn.tool_call_id().map(|id| id.as_str().to_owned()),
        result,
        created_at: turn.created_at(),
    })
}

pub(super) fn row_to_turn(row: TurnRow) -> TurnStoreResult<Turn> {
    let TurnRow {
        id,
        conversation_id,
        sequence_number,
        role: persisted_role,
        content,
        tool_calls: persisted_tool_calls,
        tool_call_id: persisted_tool_call_id,
        result: persisted_result,
        created_at,
    } = row;

    let role =
        Role::try_from(persisted_role.as_str()).map_err(TurnStoreError::invalid_persisted_data)?;
    let sequence_value =
        u64::try_from(sequence_number).map_err(TurnStoreError::invalid_persisted_data)?;
    let tool_calls = serde_json::from_value::<Vec<ToolCallRequest>>(persisted_tool_calls)
        .map_err(TurnStoreError::invalid_persisted_data)?;
    let tool_call_id = persisted_tool_call_id
        .map(ToolCallId::new)
        .transpose()
        .map_err(TurnStoreError::invalid_persisted_data)?;
    let result = persisted_result
        .map(serde_json::from_value::<ToolResult>)
        .transpose()
        .map_err(TurnStoreError::invalid_persisted_data)?;

    Ok(Turn::from_persisted(PersistedTurnData {
        id: TurnId::from_uuid(id),
        conversation_id: ConversationId::from_uuid(conversation_id),
        role,
        content,
        tool_calls,
        tool_call_id,
        result,
        sequence_number: SequenceNumber::new(sequence_value),
        created_at,
    }))
}

pub(super) fn conversation_to_row(conversation: &Conversation) -> NewConversationRow {
    NewConversationRow {
        id: conversation.id().into_inner(),
        title: conversation.title().to_owned(),
        owner_id: conversation.owner().into_inner(),
        created_at: conversation.created_at(),
        closed_at: conversation.closed_at(),
    }
}

pub(super) fn row_to_conversation(row: ConversationRow) -> MetadataStoreResult<Conversation> {
    if row.title.trim().is_empty() {
        return Err(MetadataStoreError::invalid_persisted_data(
            std::io::Error::other(format!("conversation {} has an empty title", row.id)),
        ));
    }
    Ok(Conversation::from_persisted(PersistedConversationData {
        id: ConversationId::from_uuid(row.id),
        title: row.title,
        owner: UserId::from_uuid(row.owner_id),
        created_at: row.created_at,
        closed_at: row.closed_at,
    }))
}
