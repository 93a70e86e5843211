//! Placeholder for a backend whose configuration is missing or failed to load.
//!
//! Every call fails with a configuration error, which callers treat as an
//! operational failure. Reconciliation therefore marks records on this backend
//! as unverified instead of deleting them.

use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Clone, Debug)]
pub struct UnavailableStorage {
    backend: StorageBackend,
    reason: String,
}

impl UnavailableStorage {
    pub fn new(backend: StorageBackend, reason: impl Into<String>) -> Self {
        Self {
            backend,
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn error(&self) -> StorageError {
        StorageError::ConfigError(format!("{} backend unavailable: {}", self.backend, self.reason))
    }
}

#[async_trait]
impl Storage for UnavailableStorage {
    fn backend_type(&self) -> StorageBackend {
        self.backend
    }

    async fn upload(&self, _storage_key: &str, _data: Bytes, _trace_id: &str) -> StorageResult<String> {
        Err(self.error())
    }

    async fn download(&self, _storage_key: &str, _trace_id: &str) -> StorageResult<(Bytes, String)> {
        Err(self.error())
    }

    async fn delete(&self, _storage_key: &str, _trace_id: &str) -> StorageResult<()> {
        Err(self.error())
    }

    async fn exists(&self, _storage_key: &str, _trace_id: &str) -> StorageResult<bool> {
        Err(self.error())
    }

    async fn health_check(&self, _trace_id: &str) -> StorageResult<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_call_fails_operationally() {
        let storage = UnavailableStorage::new(StorageBackend::Gcs, "GCS_BUCKET not configured");
        let err = storage.exists("photo/1/a.png", "t").await.unwrap_err();
        assert!(err.is_operational());
        assert!(err.to_string().contains("GCS_BUCKET"));
        assert!(!storage.health_check("t").await.unwrap());
    }
}
