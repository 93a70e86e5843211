//! Owner lookups against the participants table.

use async_trait::async_trait;
use dossier_core::AppError;
use sqlx::PgPool;

use super::OwnerRegistry;

#[derive(Clone)]
pub struct PgParticipantRepository {
    pool: PgPool,
}

impl PgParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OwnerRegistry for PgParticipantRepository {
    #[tracing::instrument(skip(self), fields(db.table = "participants", db.record_id = owner_id))]
    async fn owner_exists(&self, owner_id: i64) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM participants WHERE id = $1)")
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}
