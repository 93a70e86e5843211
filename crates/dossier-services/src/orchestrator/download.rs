use bytes::Bytes;
use dossier_core::validation::validate_file_id;
use dossier_core::{AppError, RequestContext};

use super::{log_failure, DownloadedFile, FileOrchestrator, OpTimer};
use crate::notifications::NoticeCategory;

impl FileOrchestrator {
    /// Fetch a file's plaintext and its recorded MIME type.
    #[tracing::instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn get_file(
        &self,
        file_id: i64,
        ctx: &RequestContext,
    ) -> Result<DownloadedFile, AppError> {
        let mut timer = OpTimer::start("download");
        let result = self.get_inner(file_id, ctx, &mut timer).await;

        timer.finish(self.metrics.as_ref(), &result);
        if let Err(e) = &result {
            log_failure("download", &ctx.trace_id, e);
        }
        result
    }

    async fn get_inner(
        &self,
        file_id: i64,
        ctx: &RequestContext,
        timer: &mut OpTimer,
    ) -> Result<DownloadedFile, AppError> {
        validate_file_id(file_id)?;
        ctx.ensure_active("metadata lookup")?;

        let metadata = self
            .resolve_metadata(file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {}", file_id)))?;
        timer.backend = Some(metadata.storage_backend);

        ctx.ensure_active("storage download")?;
        let (stored, _reported_type) = self
            .gateway
            .download(metadata.storage_backend, &metadata.path, ctx)
            .await?;

        let data = match metadata.iv.as_deref().filter(|iv| !iv.is_empty()) {
            Some(iv) => {
                ctx.ensure_active("decryption")?;
                match self.worker.decrypt(stored, iv.to_string()).await {
                    Ok(plaintext) => Bytes::from(plaintext),
                    Err(e) => {
                        self.report_decrypt_failure(file_id, &metadata.path, &e, ctx);
                        return Err(e);
                    }
                }
            }
            None => stored,
        };

        tracing::debug!(
            file_id = file_id,
            backend = %metadata.storage_backend,
            size_bytes = data.len(),
            "File retrieved"
        );

        Ok(DownloadedFile {
            data,
            mime_type: metadata.mime_type.clone(),
            metadata,
        })
    }

    fn report_decrypt_failure(
        &self,
        file_id: i64,
        storage_key: &str,
        error: &AppError,
        ctx: &RequestContext,
    ) {
        self.notices.record(
            NoticeCategory::Failure,
            format!("Decryption of file {} ({}) failed: {}", file_id, storage_key, error),
        );
        self.notify_admin(
            "Dossier decryption failure".to_string(),
            format!(
                "File {} stored at {} could not be decrypted.\nReason: {}\nTrace id: {}",
                file_id, storage_key, error, ctx.trace_id
            ),
        );
    }
}
