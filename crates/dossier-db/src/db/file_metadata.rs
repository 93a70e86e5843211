//! File metadata repository: CRUD and keyset paging for the file_metadata table.

use async_trait::async_trait;
use dossier_core::models::{FileMetadata, NewFileMetadata};
use dossier_core::AppError;
use sqlx::{PgPool, Postgres};

use super::{map_insert_error, MetadataStore};

const COLUMNS: &str = "id, path, original_name, declared_mime_type, mime_type, size, \
     storage_backend, iv, sensitive, owner_id, association, created_at";

/// Repository for the file_metadata table.
#[derive(Clone)]
pub struct PgFileMetadataRepository {
    pool: PgPool,
}

impl PgFileMetadataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataStore for PgFileMetadataRepository {
    #[tracing::instrument(skip(self, new), fields(db.table = "file_metadata", path = %new.path))]
    async fn create(&self, new: NewFileMetadata) -> Result<FileMetadata, AppError> {
        let query = format!(
            r#"
            INSERT INTO file_metadata
                (path, original_name, declared_mime_type, mime_type, size,
                 storage_backend, iv, sensitive, owner_id, association)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            COLUMNS
        );

        sqlx::query_as::<Postgres, FileMetadata>(&query)
            .bind(&new.path)
            .bind(&new.original_name)
            .bind(&new.declared_mime_type)
            .bind(&new.mime_type)
            .bind(new.size)
            .bind(new.storage_backend)
            .bind(&new.iv)
            .bind(new.sensitive)
            .bind(new.owner_id)
            .bind(&new.association)
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_error)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_metadata", db.record_id = id))]
    async fn find_by_id(&self, id: i64) -> Result<Option<FileMetadata>, AppError> {
        let query = format!("SELECT {} FROM file_metadata WHERE id = $1", COLUMNS);
        let row = sqlx::query_as::<Postgres, FileMetadata>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_metadata", db.record_id = id))]
    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM file_metadata WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_metadata"))]
    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_metadata")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_metadata"))]
    async fn list_after(&self, after_id: i64, limit: i64) -> Result<Vec<FileMetadata>, AppError> {
        let query = format!(
            "SELECT {} FROM file_metadata WHERE id > $1 ORDER BY id ASC LIMIT $2",
            COLUMNS
        );
        let rows = sqlx::query_as::<Postgres, FileMetadata>(&query)
            .bind(after_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
