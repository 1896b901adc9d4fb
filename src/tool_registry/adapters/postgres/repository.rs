//! `PostgreSQL`-backed provider directory.

use super::{models::ToolProviderRow, schema::tool_providers};
use crate::tool_registry::{
    domain::{
        Liveness, LivenessSnapshot, PersistedProviderData, ProviderId, ProviderName,
        ProviderTransport, ToolCapability, ToolProvider,
    },
    ports::{ProviderDirectory, ProviderDirectoryError, ProviderDirectoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};

/// `PostgreSQL` connection pool type for the provider directory.
pub type ProviderPgPool = Pool<ConnectionManager<PgConnection>>;

/// Reads active providers from the `tool_providers` table.
#[derive(Debug, Clone)]
pub struct PostgresProviderDirectory {
    pool: ProviderPgPool,
}

impl PostgresProviderDirectory {
    /// Creates a directory from a `PostgreSQL` pool.
    #[must_use]
    pub const fn new(pool: ProviderPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProviderDirectory for PostgresProviderDirectory {
    async fn list_active(&self) -> ProviderDirectoryResult<Vec<ToolProvider>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ProviderDirectoryError::unavailable)?;
            let rows = tool_providers::table
                .filter(tool_providers::active.eq(true))
                .order(tool_providers::name.asc())
                .select(ToolProviderRow::as_select())
                .load::<ToolProviderRow>(&mut connection)
                .map_err(ProviderDirectoryError::unavailable)?;
            rows.into_iter().map(row_to_provider).collect()
        })
        .await
        .map_err(ProviderDirectoryError::unavailable)?
    }
}

fn row_to_provider(row: ToolProviderRow) -> ProviderDirectoryResult<ToolProvider> {
    let ToolProviderRow {
        id,
        name,
        transport,
        capabilities,
        liveness,
        liveness_message,
        liveness_checked_at,
        registered_at,
        ..
    } = row;

    let parsed_name = ProviderName::new(name).map_err(ProviderDirectoryError::invalid_descriptor)?;
    let parsed_transport = serde_json::from_value::<ProviderTransport>(transport)
        .map_err(ProviderDirectoryError::invalid_descriptor)?;
    let parsed_capabilities = serde_json::from_value::<Vec<ToolCapability>>(capabilities)
        .map_err(ProviderDirectoryError::invalid_descriptor)?;
    let status =
        Liveness::try_from(liveness.as_str()).map_err(ProviderDirectoryError::invalid_descriptor)?;
    let snapshot = match (status, liveness_message) {
        (Liveness::Unreachable, Some(message)) => {
            LivenessSnapshot::unreachable(liveness_checked_at, message)
        }
        (other, _) => LivenessSnapshot::new(other, liveness_checked_at),
    };

    Ok(ToolProvider::from_persisted(PersistedProviderData {
        id: ProviderId::from_uuid(id),
        name: parsed_name,
        transport: parsed_transport,
        capabilities: parsed_capabilities,
        liveness: snapshot,
        registered_at,
    }))
}
