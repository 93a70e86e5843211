//! Database repositories for data access layer
//!
//! Each repository is responsible for one table and is consumed by the
//! orchestrator through a trait so tests can swap in memory implementations.

pub mod file_metadata;
#[cfg(any(test, feature = "test-helpers"))]
pub mod memory;
pub mod participant;

use std::time::Duration;

use async_trait::async_trait;
use dossier_core::models::{FileMetadata, NewFileMetadata};
use dossier_core::AppError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub use file_metadata::PgFileMetadataRepository;
pub use participant::PgParticipantRepository;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Durable store for file metadata.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a record; the store assigns `id` and `created_at`.
    async fn create(&self, new: NewFileMetadata) -> Result<FileMetadata, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<FileMetadata>, AppError>;

    /// Delete a record, returning whether a row was removed.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    async fn count(&self) -> Result<i64, AppError>;

    /// Keyset page: records with `id > after_id`, ascending, at most `limit`.
    async fn list_after(&self, after_id: i64, limit: i64) -> Result<Vec<FileMetadata>, AppError>;

    /// Cheap liveness query.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Lookup of the entities that own files.
#[async_trait]
pub trait OwnerRegistry: Send + Sync {
    async fn owner_exists(&self, owner_id: i64) -> Result<bool, AppError>;
}

/// Open a pool and apply the embedded migrations.
pub async fn connect_and_migrate(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
        .connect(database_url)
        .await?;

    sqlx::migrate!("../../migrations").run(&pool).await?;

    tracing::info!("Database connected and migrations applied");
    Ok(pool)
}

/// Map a unique-constraint violation to a caller-facing error.
pub(crate) fn map_insert_error(err: sqlx::Error) -> AppError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.code().as_deref() == Some("23505") {
            return AppError::InvalidInput(
                "A file with this path already exists on this backend".to_string(),
            );
        }
    }
    AppError::Database(err)
}
