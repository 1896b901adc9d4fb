//! Diesel schema for the provider directory.

diesel::table! {
    /// Provider descriptors published by the catalogue.
    tool_providers (id) {
        /// Provider identifier.
        id -> Uuid,
        /// Unique provider name.
        #[max_length = 100]
        name -> Varchar,
        /// Transport descriptor as JSONB.
        transport -> Jsonb,
        /// Advertised capabilities as a JSONB array.
        capabilities -> Jsonb,
        /// Whether the catalogue lists the provider as active.
        active -> Bool,
        /// Last published liveness (`unknown`, `reachable`, `unreachable`).
        #[max_length = 20]
        liveness -> Varchar,
        /// Optional liveness detail.
        liveness_message -> Nullable<Text>,
        /// When liveness was last observed.
        liveness_checked_at -> Timestamptz,
        /// Registration timestamp.
        registered_at -> Timestamptz,
    }
}
