use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow, PgSslMode};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use depot_core::{BlobKey, FileId, FileRecord, OwnerId, SearchFilter};
use depot_metadata::{MetadataError, MetadataStore};

use crate::config::PostgresConfig;
use crate::migrations;

const COLUMNS: &str = "id, owner_id, name, size_bytes, content_type, blob_key, \
                       public_url, is_public, expires_at, created_at, updated_at";

/// Build `PgConnectOptions` from a [`PostgresConfig`], applying SSL settings
/// when configured.
pub(crate) fn build_connect_options(
    config: &PostgresConfig,
) -> Result<PgConnectOptions, MetadataError> {
    let mut options: PgConnectOptions = config
        .url
        .parse()
        .map_err(|e: sqlx::Error| MetadataError::Connection(e.to_string()))?;

    if let Some(ref mode) = config.ssl_mode {
        let ssl_mode = match mode.as_str() {
            "disable" => PgSslMode::Disable,
            "prefer" => PgSslMode::Prefer,
            "require" => PgSslMode::Require,
            "verify-ca" => PgSslMode::VerifyCa,
            "verify-full" => PgSslMode::VerifyFull,
            other => {
                return Err(MetadataError::Connection(format!(
                    "unknown ssl_mode: {other}"
                )));
            }
        };
        options = options.ssl_mode(ssl_mode);
    }
    if let Some(ref path) = config.ssl_root_cert {
        options = options.ssl_root_cert(path);
    }
    if let Some(ref path) = config.ssl_cert {
        options = options.ssl_client_cert(path);
    }
    if let Some(ref path) = config.ssl_key {
        options = options.ssl_client_key(path);
    }

    Ok(options)
}

/// Map a `sqlx` error onto [`MetadataError`].
fn backend_error(e: sqlx::Error) -> MetadataError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            MetadataError::Connection(e.to_string())
        }
        other => MetadataError::Backend(other.to_string()),
    }
}

/// Escape `LIKE` metacharacters so a name filter matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn size_to_db(size: u64) -> Result<i64, MetadataError> {
    i64::try_from(size)
        .map_err(|_| MetadataError::Serialization(format!("size {size} exceeds BIGINT range")))
}

fn record_from_row(row: &PgRow) -> Result<FileRecord, MetadataError> {
    let get_err = |e: sqlx::Error| MetadataError::Serialization(e.to_string());

    let size: i64 = row.try_get("size_bytes").map_err(get_err)?;
    let size_bytes = u64::try_from(size)
        .map_err(|_| MetadataError::Serialization(format!("negative size_bytes: {size}")))?;

    Ok(FileRecord {
        id: FileId::from(row.try_get::<Uuid, _>("id").map_err(get_err)?),
        owner: OwnerId::from(row.try_get::<Uuid, _>("owner_id").map_err(get_err)?),
        name: row.try_get("name").map_err(get_err)?,
        size_bytes,
        content_type: row.try_get("content_type").map_err(get_err)?,
        blob_key: BlobKey::new(row.try_get::<String, _>("blob_key").map_err(get_err)?),
        public_url: row.try_get("public_url").map_err(get_err)?,
        is_public: row.try_get("is_public").map_err(get_err)?,
        expires_at: row.try_get("expires_at").map_err(get_err)?,
        created_at: row.try_get("created_at").map_err(get_err)?,
        updated_at: row.try_get("updated_at").map_err(get_err)?,
    })
}

fn records_from_rows(rows: &[PgRow]) -> Result<Vec<FileRecord>, MetadataError> {
    rows.iter().map(record_from_row).collect()
}

/// PostgreSQL-backed implementation of [`MetadataStore`].
///
/// All records live in one table keyed by file id. Owner-scoped queries are
/// ordered by `created_at, id`.
pub struct PostgresMetadataStore {
    pool: PgPool,
    config: Arc<PostgresConfig>,
}

impl PostgresMetadataStore {
    /// Connect to `PostgreSQL` and run migrations.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Connection`] if pool creation fails, or
    /// [`MetadataError::Backend`] if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, MetadataError> {
        let connect_options = build_connect_options(&config)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect_with(connect_options)
            .await
            .map_err(|e| MetadataError::Connection(e.to_string()))?;

        Self::from_pool(pool, config).await
    }

    /// Create a store from an existing pool. Runs migrations on creation.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Backend`] if migrations fail.
    pub async fn from_pool(pool: PgPool, config: PostgresConfig) -> Result<Self, MetadataError> {
        migrations::run_migrations(&pool, &config)
            .await
            .map_err(|e| MetadataError::Backend(e.to_string()))?;
        debug!(table = %config.files_table(), "metadata migrations applied");

        Ok(Self {
            pool,
            config: Arc::new(config),
        })
    }
}

#[async_trait]
impl MetadataStore for PostgresMetadataStore {
    async fn create(&self, record: &FileRecord) -> Result<(), MetadataError> {
        let table = self.config.files_table();
        let query = format!(
            "INSERT INTO {table} ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );

        sqlx::query(&query)
            .bind(record.id.as_uuid())
            .bind(record.owner.as_uuid())
            .bind(&record.name)
            .bind(size_to_db(record.size_bytes)?)
            .bind(&record.content_type)
            .bind(record.blob_key.as_str())
            .bind(record.public_url.as_deref())
            .bind(record.is_public)
            .bind(record.expires_at)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    MetadataError::Conflict(record.id)
                }
                other => backend_error(other),
            })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &FileId) -> Result<Option<FileRecord>, MetadataError> {
        let table = self.config.files_table();
        let query = format!("SELECT {COLUMNS} FROM {table} WHERE id = $1");

        let row = sqlx::query(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_error)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn find_by_owner(&self, owner: &OwnerId) -> Result<Vec<FileRecord>, MetadataError> {
        let table = self.config.files_table();
        let query = format!(
            "SELECT {COLUMNS} FROM {table} WHERE owner_id = $1 ORDER BY created_at, id"
        );

        let rows = sqlx::query(&query)
            .bind(owner.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(backend_error)?;

        records_from_rows(&rows)
    }

    async fn find_filtered(
        &self,
        owner: &OwnerId,
        filter: &SearchFilter,
    ) -> Result<Vec<FileRecord>, MetadataError> {
        let table = self.config.files_table();
        // Unset criteria bind NULL and drop out of the predicate.
        let query = format!(
            "SELECT {COLUMNS} FROM {table} \
             WHERE owner_id = $1 \
               AND ($2::TEXT IS NULL OR name ILIKE $2 ESCAPE '\\') \
               AND ($3::TIMESTAMPTZ IS NULL OR created_at >= $3) \
               AND ($4::TIMESTAMPTZ IS NULL OR created_at <= $4) \
               AND ($5::TEXT IS NULL OR content_type = $5) \
             ORDER BY created_at, id"
        );

        let name_pattern = filter
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .map(escape_like);
        let content_type = filter.content_type.as_deref().filter(|c| !c.is_empty());
        let start: Option<DateTime<Utc>> = filter.created.and_then(|r| r.start);
        let end: Option<DateTime<Utc>> = filter.created.and_then(|r| r.end);

        let rows = sqlx::query(&query)
            .bind(owner.as_uuid())
            .bind(name_pattern)
            .bind(start)
            .bind(end)
            .bind(content_type)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_error)?;

        records_from_rows(&rows)
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<FileRecord>, MetadataError> {
        let table = self.config.files_table();
        let query = format!(
            "SELECT {COLUMNS} FROM {table} \
             WHERE expires_at IS NOT NULL AND expires_at <= $1 \
             ORDER BY created_at, id"
        );

        let rows = sqlx::query(&query)
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_error)?;

        records_from_rows(&rows)
    }

    async fn update(&self, record: &FileRecord) -> Result<(), MetadataError> {
        let table = self.config.files_table();
        let query = format!(
            "UPDATE {table} SET \
                 owner_id = $2, name = $3, size_bytes = $4, content_type = $5, \
                 blob_key = $6, public_url = $7, is_public = $8, expires_at = $9, \
                 created_at = $10, updated_at = $11 \
             WHERE id = $1"
        );

        let result = sqlx::query(&query)
            .bind(record.id.as_uuid())
            .bind(record.owner.as_uuid())
            .bind(&record.name)
            .bind(size_to_db(record.size_bytes)?)
            .bind(&record.content_type)
            .bind(record.blob_key.as_str())
            .bind(record.public_url.as_deref())
            .bind(record.is_public)
            .bind(record.expires_at)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&self.pool)
            .await
            .map_err(backend_error)?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(record.id));
        }
        Ok(())
    }

    async fn delete(&self, id: &FileId) -> Result<bool, MetadataError> {
        let table = self.config.files_table();
        let query = format!("DELETE FROM {table} WHERE id = $1");

        let result = sqlx::query(&query)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(backend_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_wraps_and_escapes() {
        assert_eq!(escape_like("report"), "%report%");
        assert_eq!(escape_like("50%_off"), "%50\\%\\_off%");
        assert_eq!(escape_like("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn size_out_of_range_is_rejected() {
        assert!(size_to_db(u64::MAX).is_err());
        assert_eq!(size_to_db(42).unwrap(), 42);
    }

    #[test]
    fn unknown_ssl_mode_is_rejected() {
        let config = PostgresConfig {
            ssl_mode: Some("sometimes".into()),
            ..PostgresConfig::default()
        };
        assert!(matches!(
            build_connect_options(&config),
            Err(MetadataError::Connection(_))
        ));
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;

    fn test_config() -> PostgresConfig {
        PostgresConfig {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/depot_test".to_string()),
            table_prefix: format!("test_{}_", Uuid::new_v4().simple()),
            ..PostgresConfig::default()
        }
    }

    #[tokio::test]
    async fn conformance() {
        let store = PostgresMetadataStore::new(test_config())
            .await
            .expect("pool creation should succeed");
        depot_metadata::testing::run_metadata_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }
}
