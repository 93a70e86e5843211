use dossier_core::validation::validate_file_id;
use dossier_core::{AppError, RequestContext};

use super::{log_failure, FileOrchestrator, OpTimer};
use crate::notifications::NoticeCategory;

impl FileOrchestrator {
    /// Delete a file and its metadata. Deleting an unknown id succeeds.
    #[tracing::instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn delete_file(&self, file_id: i64, ctx: &RequestContext) -> Result<(), AppError> {
        let mut timer = OpTimer::start("delete");
        let result = self.delete_inner(file_id, ctx, &mut timer).await;

        timer.finish(self.metrics.as_ref(), &result);
        if let Err(e) = &result {
            log_failure("delete", &ctx.trace_id, e);
        }
        result
    }

    async fn delete_inner(
        &self,
        file_id: i64,
        ctx: &RequestContext,
        timer: &mut OpTimer,
    ) -> Result<(), AppError> {
        validate_file_id(file_id)?;
        ctx.ensure_active("metadata lookup")?;

        let Some(metadata) = self.resolve_metadata(file_id).await? else {
            tracing::debug!(file_id = file_id, "Nothing to delete");
            return Ok(());
        };
        timer.backend = Some(metadata.storage_backend);

        ctx.ensure_active("storage delete")?;
        self.gateway
            .delete(metadata.storage_backend, &metadata.path, ctx)
            .await?;

        ctx.ensure_active("metadata delete")?;
        let removed = self
            .gateway
            .retry()
            .execute_with_condition(|| self.metadata.delete(file_id), AppError::is_transient)
            .await?;
        self.cache.invalidate(file_id);

        if !removed {
            tracing::debug!(file_id = file_id, "Metadata already removed by a concurrent delete");
            return Ok(());
        }

        self.notices.record(
            NoticeCategory::Deletion,
            format!(
                "File {} ({}) of owner {} deleted from {}",
                file_id, metadata.association, metadata.owner_id, metadata.storage_backend
            ),
        );
        tracing::info!(
            file_id = file_id,
            backend = %metadata.storage_backend,
            storage_key = %metadata.path,
            "File deleted"
        );
        Ok(())
    }
}
