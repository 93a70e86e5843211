//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use bytes::Bytes;
use dossier_core::AppError;
use thiserror::Error;

use crate::StorageBackend;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Operation not supported by this backend: {0}")]
    Unsupported(&'static str),
}

impl StorageError {
    /// Whether the error reflects a failing backend rather than a definite answer.
    ///
    /// `NotFound` and `InvalidKey` mean the backend responded correctly, and
    /// `Unsupported` means it was never asked.
    pub fn is_operational(&self) -> bool {
        !matches!(
            self,
            StorageError::NotFound(_) | StorageError::InvalidKey(_) | StorageError::Unsupported(_)
        )
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::ObjectMissing(key),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::ConfigError(msg) => AppError::Config(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All storage backends (local disk, NAS, S3, GCS, Azure) implement this trait so
/// the orchestrator can route to any of them without knowing which one it is.
/// Implementations are stateless per call and unaware of each other.
///
/// `trace_id` is only used for log correlation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Store `data` under `storage_key` and return the key actually written.
    async fn upload(&self, storage_key: &str, data: Bytes, trace_id: &str)
        -> StorageResult<String>;

    /// Fetch an object, returning its bytes and content type.
    ///
    /// The content type is `application/octet-stream` when nothing better is known.
    async fn download(&self, storage_key: &str, trace_id: &str)
        -> StorageResult<(Bytes, String)>;

    /// Delete an object. Deleting an absent key succeeds.
    async fn delete(&self, storage_key: &str, trace_id: &str) -> StorageResult<()>;

    /// Check if an object exists
    ///
    /// Optional; callers fall back to a download probe on `Unsupported`.
    async fn exists(&self, _storage_key: &str, _trace_id: &str) -> StorageResult<bool> {
        Err(StorageError::Unsupported("exists"))
    }

    /// Backend-native health check
    ///
    /// Optional; callers fall back to a probe upload and delete on `Unsupported`.
    async fn health_check(&self, _trace_id: &str) -> StorageResult<bool> {
        Err(StorageError::Unsupported("health_check"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definite_answers_are_not_operational() {
        assert!(!StorageError::NotFound("a".into()).is_operational());
        assert!(!StorageError::InvalidKey("..".into()).is_operational());
        assert!(!StorageError::Unsupported("exists").is_operational());
        assert!(StorageError::BackendError("503".into()).is_operational());
        assert!(StorageError::ConfigError("no bucket".into()).is_operational());
    }

    #[test]
    fn maps_into_app_errors() {
        assert!(matches!(
            AppError::from(StorageError::NotFound("k".into())),
            AppError::ObjectMissing(_)
        ));
        assert!(matches!(
            AppError::from(StorageError::InvalidKey("k".into())),
            AppError::InvalidInput(_)
        ));
        assert!(matches!(
            AppError::from(StorageError::UploadFailed("quota".into())),
            AppError::Storage(_)
        ));
    }
}
