//! Network-attached storage provider.
//!
//! The share is mounted into the local filesystem by the operator. Unlike the
//! local backend the mount point is never created: a missing mount means the
//! share is down, not that a directory should appear on the root disk.

use crate::local::LocalStorage;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;

#[derive(Clone, Debug)]
pub struct NasStorage {
    inner: LocalStorage,
}

impl NasStorage {
    /// Attach to an already mounted share.
    pub async fn new(mount_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let mount_path = mount_path.into();
        let meta = fs::metadata(&mount_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "NAS mount {} is not accessible: {}",
                mount_path.display(),
                e
            ))
        })?;

        if !meta.is_dir() {
            return Err(StorageError::ConfigError(format!(
                "NAS mount {} is not a directory",
                mount_path.display()
            )));
        }

        Ok(Self {
            inner: LocalStorage::existing(mount_path, StorageBackend::Nas),
        })
    }
}

#[async_trait]
impl Storage for NasStorage {
    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Nas
    }

    async fn upload(
        &self,
        storage_key: &str,
        data: Bytes,
        trace_id: &str,
    ) -> StorageResult<String> {
        self.inner.upload(storage_key, data, trace_id).await
    }

    async fn download(
        &self,
        storage_key: &str,
        trace_id: &str,
    ) -> StorageResult<(Bytes, String)> {
        self.inner.download(storage_key, trace_id).await
    }

    async fn delete(&self, storage_key: &str, trace_id: &str) -> StorageResult<()> {
        self.inner.delete(storage_key, trace_id).await
    }

    async fn exists(&self, storage_key: &str, trace_id: &str) -> StorageResult<bool> {
        self.inner.exists(storage_key, trace_id).await
    }

    /// Healthy when the mount is still a readable directory.
    async fn health_check(&self, trace_id: &str) -> StorageResult<bool> {
        let healthy = match fs::read_dir(self.inner.base_path()).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    trace_id = %trace_id,
                    mount = %self.inner.base_path().display(),
                    error = %e,
                    "NAS mount not readable"
                );
                false
            }
        };
        Ok(healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_mount_is_config_error() {
        let dir = tempdir().unwrap();
        let result = NasStorage::new(dir.path().join("not-mounted")).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[tokio::test]
    async fn round_trip_and_health() {
        let dir = tempdir().unwrap();
        let nas = NasStorage::new(dir.path()).await.unwrap();
        assert_eq!(nas.backend_type(), StorageBackend::Nas);

        nas.upload("signature/9/s.png", Bytes::from_static(b"sig"), "t")
            .await
            .unwrap();
        let (data, _) = nas.download("signature/9/s.png", "t").await.unwrap();
        assert_eq!(&data[..], b"sig");
        assert!(nas.health_check("t").await.unwrap());
    }
}
