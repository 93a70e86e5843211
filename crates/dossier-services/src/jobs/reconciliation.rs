//! Removes metadata whose physical object is confirmed absent.

use std::sync::Arc;

use dossier_core::{AppError, FileMetadata, RequestContext};
use dossier_db::MetadataStore;
use serde::Serialize;

use crate::cache::MetadataCache;
use crate::gateway::StorageGateway;
use crate::notifications::{NoticeCategory, NotificationBatch};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub scanned: usize,
    pub removed: usize,
    /// Records whose presence could not be confirmed either way.
    pub unverified: usize,
    /// False when a page could not be loaded and the sweep stopped early.
    pub completed: bool,
}

pub struct ReconciliationJob {
    gateway: Arc<StorageGateway>,
    metadata: Arc<dyn MetadataStore>,
    cache: Arc<MetadataCache>,
    notices: Arc<NotificationBatch>,
    batch_size: i64,
}

impl ReconciliationJob {
    pub fn new(
        gateway: Arc<StorageGateway>,
        metadata: Arc<dyn MetadataStore>,
        cache: Arc<MetadataCache>,
        notices: Arc<NotificationBatch>,
        batch_size: i64,
    ) -> Self {
        Self {
            gateway,
            metadata,
            cache,
            notices,
            batch_size: batch_size.max(1),
        }
    }

    /// One full sweep over the metadata, in id order.
    #[tracing::instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id, job = "reconciliation"))]
    pub async fn run(&self, ctx: &RequestContext) -> ReconciliationReport {
        let mut report = ReconciliationReport::default();
        let mut after_id = 0;

        tracing::info!(batch_size = self.batch_size, "Starting reconciliation");

        loop {
            if ctx.is_cancelled() {
                tracing::warn!(scanned = report.scanned, "Reconciliation cancelled");
                return report;
            }

            let page = match self.load_page(after_id).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(error = %e, after_id = after_id, "Failed to load metadata page, stopping sweep");
                    return report;
                }
            };
            let Some(last) = page.last() else {
                break;
            };
            after_id = last.id;
            let full_page = page.len() as i64 >= self.batch_size;

            for record in page {
                report.scanned += 1;
                self.check_record(record, ctx, &mut report).await;
            }

            if !full_page {
                break;
            }
        }

        report.completed = true;
        tracing::info!(
            scanned = report.scanned,
            removed = report.removed,
            unverified = report.unverified,
            "Reconciliation completed"
        );
        report
    }

    async fn load_page(&self, after_id: i64) -> Result<Vec<FileMetadata>, AppError> {
        self.gateway
            .retry()
            .execute_with_condition(
                || self.metadata.list_after(after_id, self.batch_size),
                AppError::is_transient,
            )
            .await
    }

    async fn check_record(
        &self,
        record: FileMetadata,
        ctx: &RequestContext,
        report: &mut ReconciliationReport,
    ) {
        match self
            .gateway
            .exists(record.storage_backend, &record.path, ctx)
            .await
        {
            Ok(true) => {}
            Ok(false) => match self.metadata.delete(record.id).await {
                Ok(false) => {
                    self.cache.invalidate(record.id);
                    tracing::debug!(file_id = record.id, "Metadata already removed");
                }
                Ok(true) => {
                    self.cache.invalidate(record.id);
                    report.removed += 1;
                    tracing::info!(
                        file_id = record.id,
                        backend = %record.storage_backend,
                        storage_key = %record.path,
                        "Removed metadata for missing object"
                    );
                    self.notices.record(
                        NoticeCategory::Deletion,
                        format!(
                            "File {} ({}) removed by reconciliation: object missing from {}",
                            record.id, record.path, record.storage_backend
                        ),
                    );
                }
                Err(e) => {
                    report.unverified += 1;
                    tracing::error!(error = %e, file_id = record.id, "Failed to remove orphaned metadata");
                }
            },
            Err(e) => {
                report.unverified += 1;
                tracing::warn!(
                    error = %e,
                    file_id = record.id,
                    backend = %record.storage_backend,
                    "Could not verify object presence, skipping"
                );
            }
        }
    }
}
