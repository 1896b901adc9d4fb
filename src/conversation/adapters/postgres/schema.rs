//! Diesel schema for conversation persistence.

diesel::table! {
    /// Conversation metadata records.
    conversations (id) {
        /// Internal conversation identifier.
        id -> Uuid,
        /// Display title.
        #[max_length = 200]
        title -> Varchar,
        /// Owning user.
        owner_id -> Uuid,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Close timestamp, if the conversation was closed.
        closed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Append-only turn log, unique on conversation and sequence number.
    turns (id) {
        /// Internal turn identifier.
        id -> Uuid,
        /// Owning conversation.
        conversation_id -> Uuid,
        /// Position in the conversation log, starting at 1.
        sequence_number -> Int8,
        /// Author role.
        #[max_length = 20]
        role -> Varchar,
        /// Text content.
        content -> Text,
        /// Tool call requests emitted by assistant turns.
        tool_calls -> Jsonb,
        /// Answered call identifier for tool turns.
        #[max_length = 255]
        tool_call_id -> Nullable<Varchar>,
        /// Structured tool result for tool turns.
        result -> Nullable<Jsonb>,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(turns -> conversations (conversation_id));
diesel::allow_tables_to_appear_in_same_query!(conversations, turns);
