//! File orchestration: validation, encryption, provider selection, metadata
//! persistence, caching, fallback and notifications.

mod delete;
mod download;
mod health;
mod upload;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dossier_core::validation::UploadValidator;
use dossier_core::{AppError, ErrorMetadata, FileMetadata, StorageBackend};
use dossier_db::{MetadataStore, OwnerRegistry};
use dossier_infra::{MetricsSink, Notifier};
use serde::Serialize;
use tokio::time::Instant;

use crate::cache::MetadataCache;
use crate::encryption_worker::EncryptionWorker;
use crate::gateway::StorageGateway;
use crate::notifications::NotificationBatch;

/// An upload as received from the caller.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub data: Bytes,
    pub original_name: String,
    /// Content type claimed by the client; stored but never trusted.
    pub declared_mime_type: Option<String>,
    pub owner_id: i64,
    pub category: String,
    pub sensitive: bool,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_id: i64,
    pub storage_key: String,
    pub metadata: FileMetadata,
}

#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// Plaintext payload.
    pub data: Bytes,
    pub mime_type: String,
    pub metadata: FileMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub providers: std::collections::BTreeMap<String, bool>,
    pub metadata_store: bool,
    pub active_backend: String,
}

impl HealthReport {
    /// The metadata store and the active backend respond. Inactive backends,
    /// including unconfigured ones, do not count.
    pub fn is_healthy(&self) -> bool {
        self.metadata_store
            && self
                .providers
                .get(&self.active_backend)
                .copied()
                .unwrap_or(false)
    }
}

/// Collaborators of the orchestrator, constructed once at startup.
pub struct OrchestratorDeps {
    pub gateway: Arc<StorageGateway>,
    pub metadata: Arc<dyn MetadataStore>,
    pub owners: Arc<dyn OwnerRegistry>,
    pub validator: UploadValidator,
    pub worker: EncryptionWorker,
    pub cache: Arc<MetadataCache>,
    pub notices: Arc<NotificationBatch>,
    pub notifier: Arc<dyn Notifier>,
    pub metrics: Arc<dyn MetricsSink>,
}

pub struct FileOrchestrator {
    gateway: Arc<StorageGateway>,
    metadata: Arc<dyn MetadataStore>,
    owners: Arc<dyn OwnerRegistry>,
    validator: UploadValidator,
    worker: EncryptionWorker,
    cache: Arc<MetadataCache>,
    notices: Arc<NotificationBatch>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<dyn MetricsSink>,
}

impl FileOrchestrator {
    pub fn new(deps: OrchestratorDeps) -> Self {
        Self {
            gateway: deps.gateway,
            metadata: deps.metadata,
            owners: deps.owners,
            validator: deps.validator,
            worker: deps.worker,
            cache: deps.cache,
            notices: deps.notices,
            notifier: deps.notifier,
            metrics: deps.metrics,
        }
    }

    pub fn gateway(&self) -> &StorageGateway {
        &self.gateway
    }

    /// Cache-or-store lookup. A miss repopulates the cache.
    async fn resolve_metadata(&self, file_id: i64) -> Result<Option<FileMetadata>, AppError> {
        if let Some(metadata) = self.cache.get(file_id) {
            tracing::debug!(file_id = file_id, "Metadata cache hit");
            return Ok(Some(metadata));
        }

        let epoch = self.cache.epoch();
        let found = self
            .gateway
            .retry()
            .execute_with_condition(|| self.metadata.find_by_id(file_id), AppError::is_transient)
            .await?;

        if let Some(metadata) = &found {
            if !self.cache.insert_if_current(metadata.clone(), epoch) {
                tracing::debug!(file_id = file_id, "Cache invalidated during lookup, not caching");
            }
        }
        Ok(found)
    }

    /// Send an admin notification in the background; failures are only logged.
    fn notify_admin(&self, subject: String, body: String) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&subject, &body).await {
                tracing::warn!(error = %e, subject = %subject, "Admin notification failed");
            }
        });
    }
}

/// Duration and error accounting for one orchestrator operation.
struct OpTimer {
    operation: &'static str,
    backend: Option<StorageBackend>,
    start: Instant,
}

impl OpTimer {
    fn start(operation: &'static str) -> Self {
        Self {
            operation,
            backend: None,
            start: Instant::now(),
        }
    }

    fn finish<T>(self, metrics: &dyn MetricsSink, result: &Result<T, AppError>) -> Duration {
        let elapsed = self.start.elapsed();
        let backend = self.backend.map(|b| b.as_str()).unwrap_or("none");
        metrics.record_duration(self.operation, backend, elapsed, result.is_ok());
        if let Err(e) = result {
            metrics.record_error(self.operation, backend, e.error_code());
        }
        elapsed
    }
}

/// Log an operation failure at the level its error kind calls for.
fn log_failure(operation: &str, trace_id: &str, error: &AppError) {
    use dossier_core::LogLevel;

    match error.log_level() {
        LogLevel::Debug => tracing::debug!(operation = %operation, trace_id = %trace_id, error = %error, "Operation rejected"),
        LogLevel::Warn => tracing::warn!(operation = %operation, trace_id = %trace_id, error = %error, "Operation failed"),
        LogLevel::Error => tracing::error!(operation = %operation, trace_id = %trace_id, error = %error, "Operation failed"),
    }
}
