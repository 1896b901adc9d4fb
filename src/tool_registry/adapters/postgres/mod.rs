//! `PostgreSQL` provider directory.

mod models;
mod repository;
mod schema;

pub use repository::{PostgresProviderDirectory, ProviderPgPool};
