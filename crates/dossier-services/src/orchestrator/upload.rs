use bytes::Bytes;
use dossier_core::models::NewFileMetadata;
use dossier_core::validation::{extension_for, sanitize_filename};
use dossier_core::{AppError, RequestContext, StorageBackend};
use dossier_storage::keys::{fallback_key, generate_storage_key};

use super::{log_failure, FileOrchestrator, OpTimer, UploadRequest, UploadedFile};
use crate::notifications::NoticeCategory;

impl FileOrchestrator {
    /// Validate, optionally encrypt, store on the active backend and record
    /// metadata.
    ///
    /// When the payload cannot be stored or recorded, the plaintext is written
    /// to the local backend under `fallback/` and an administrator is told
    /// where; the original error is returned either way.
    #[tracing::instrument(
        skip(self, request, ctx),
        fields(
            trace_id = %ctx.trace_id,
            owner_id = request.owner_id,
            category = %request.category,
            sensitive = request.sensitive,
            size_bytes = request.data.len()
        )
    )]
    pub async fn upload_file(
        &self,
        request: UploadRequest,
        ctx: &RequestContext,
    ) -> Result<UploadedFile, AppError> {
        let mut timer = OpTimer::start("upload");
        timer.backend = Some(self.gateway.active_backend());

        let result = self.upload_inner(request, ctx).await;

        let elapsed = timer.finish(self.metrics.as_ref(), &result);
        match &result {
            Ok(uploaded) => tracing::info!(
                file_id = uploaded.file_id,
                storage_key = %uploaded.storage_key,
                duration_ms = elapsed.as_secs_f64() * 1000.0,
                "File uploaded"
            ),
            Err(e) => log_failure("upload", &ctx.trace_id, e),
        }
        result
    }

    async fn upload_inner(
        &self,
        request: UploadRequest,
        ctx: &RequestContext,
    ) -> Result<UploadedFile, AppError> {
        ctx.ensure_active("validation")?;
        let validated = self.validator.validate(&request.data, &request.category)?;
        if !self.owners.owner_exists(request.owner_id).await? {
            return Err(AppError::UnknownOwner(request.owner_id));
        }
        let original_name = sanitize_filename(&request.original_name)?;

        let backend = self.gateway.active_backend();
        let storage_key = generate_storage_key(
            &validated.association,
            request.owner_id,
            extension_for(validated.mime_type),
        );

        let (payload, iv) = if request.sensitive {
            ctx.ensure_active("encryption")?;
            let (ciphertext, iv) = self.worker.encrypt(request.data.clone()).await?;
            (Bytes::from(ciphertext), Some(iv))
        } else {
            (request.data.clone(), None)
        };

        let new = NewFileMetadata {
            path: storage_key.clone(),
            original_name,
            declared_mime_type: request.declared_mime_type.clone(),
            mime_type: validated.mime_type.to_string(),
            size: request.data.len() as i64,
            storage_backend: backend,
            iv,
            sensitive: request.sensitive,
            owner_id: request.owner_id,
            association: validated.association,
        };

        let stored = match self.store(backend, &storage_key, payload, new, ctx).await {
            Ok(stored) => stored,
            Err(e @ AppError::Cancelled(_)) => return Err(e),
            Err(e) => {
                self.write_fallback(&storage_key, request.data, &e, ctx).await;
                return Err(e);
            }
        };

        self.cache.insert(stored.clone());
        if stored.sensitive {
            self.notices.record(
                NoticeCategory::SensitiveUpload,
                format!(
                    "File {} ({}) for owner {} stored encrypted on {}",
                    stored.id, stored.association, stored.owner_id, stored.storage_backend
                ),
            );
        }

        Ok(UploadedFile {
            file_id: stored.id,
            storage_key,
            metadata: stored,
        })
    }

    /// Upload the payload and persist its metadata. If the metadata cannot be
    /// written, the uploaded object is removed again.
    async fn store(
        &self,
        backend: StorageBackend,
        storage_key: &str,
        payload: Bytes,
        new: NewFileMetadata,
        ctx: &RequestContext,
    ) -> Result<dossier_core::FileMetadata, AppError> {
        ctx.ensure_active("storage upload")?;
        self.gateway
            .upload(backend, storage_key, payload, ctx)
            .await?;

        let created = match ctx.ensure_active("metadata write") {
            Ok(()) => self.metadata.create(new).await,
            Err(e) => Err(e),
        };

        match created {
            Ok(stored) => Ok(stored),
            Err(e) => {
                self.discard_object(backend, storage_key, &ctx.trace_id).await;
                Err(e)
            }
        }
    }

    /// Best-effort removal of an object whose metadata was never written.
    async fn discard_object(&self, backend: StorageBackend, storage_key: &str, trace_id: &str) {
        // A fresh context: the request's own token may already be cancelled.
        let ctx = RequestContext::with_trace_id(trace_id);
        if let Err(e) = self.gateway.delete(backend, storage_key, &ctx).await {
            tracing::warn!(
                error = %e,
                backend = %backend,
                storage_key = %storage_key,
                trace_id = %trace_id,
                "Failed to remove object without metadata; it is left orphaned"
            );
        }
    }

    async fn write_fallback(
        &self,
        storage_key: &str,
        plaintext: Bytes,
        cause: &AppError,
        ctx: &RequestContext,
    ) {
        let key = fallback_key(storage_key);
        let local = self.gateway.registry().local();

        let location = match local.upload(&key, plaintext, &ctx.trace_id).await {
            Ok(written) => {
                tracing::warn!(
                    trace_id = %ctx.trace_id,
                    fallback_key = %written,
                    error = %cause,
                    "Upload failed, payload saved to local fallback"
                );
                format!("local:{}", written)
            }
            Err(fallback_err) => {
                tracing::error!(
                    trace_id = %ctx.trace_id,
                    fallback_key = %key,
                    error = %cause,
                    fallback_error = %fallback_err,
                    "Upload failed and the fallback write failed too"
                );
                format!("none (fallback write failed: {})", fallback_err)
            }
        };

        self.notices.record(
            NoticeCategory::Failure,
            format!("Upload of {} failed: {}; fallback: {}", storage_key, cause, location),
        );
        self.notify_admin(
            "Dossier upload failed".to_string(),
            format!(
                "Upload failed for key {} on {}.\nReason: {}\nFallback location: {}\nTrace id: {}",
                storage_key,
                self.gateway.active_backend(),
                cause,
                location,
                ctx.trace_id
            ),
        );
    }
}
