use sqlx::PgPool;

use crate::config::PostgresConfig;

/// Create the files table and its indexes if they do not exist.
///
/// # Errors
///
/// Returns a [`sqlx::Error`] if any DDL statement fails.
pub async fn run_migrations(pool: &PgPool, config: &PostgresConfig) -> Result<(), sqlx::Error> {
    let files_table = config.files_table();
    let prefix = &config.table_prefix;

    let create_files = format!(
        "CREATE TABLE IF NOT EXISTS {files_table} (
            id UUID PRIMARY KEY,
            owner_id UUID NOT NULL,
            name TEXT NOT NULL,
            size_bytes BIGINT NOT NULL,
            content_type TEXT NOT NULL,
            blob_key TEXT NOT NULL,
            public_url TEXT,
            is_public BOOLEAN NOT NULL DEFAULT FALSE,
            expires_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )"
    );

    // Listing and search are always scoped by owner, ordered by creation.
    let create_owner_idx = format!(
        "CREATE INDEX IF NOT EXISTS {prefix}files_owner_created_idx \
         ON {files_table} (owner_id, created_at, id)"
    );

    let create_expires_idx = format!(
        "CREATE INDEX IF NOT EXISTS {prefix}files_expires_at_idx \
         ON {files_table} (expires_at) WHERE expires_at IS NOT NULL"
    );

    sqlx::query(&create_files).execute(pool).await?;
    sqlx::query(&create_owner_idx).execute(pool).await?;
    sqlx::query(&create_expires_idx).execute(pool).await?;

    Ok(())
}
