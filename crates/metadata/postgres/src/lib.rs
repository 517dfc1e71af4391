//! `PostgreSQL` backend for the depot metadata store.
//!
//! Records live in a single `{schema}.{prefix}files` table created on startup
//! by [`migrations::run_migrations`].

pub mod config;
pub mod migrations;
mod store;

pub use config::PostgresConfig;
pub use store::PostgresMetadataStore;
