use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use dossier_core::validation::sniff_mime;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
///
/// Also backs the NAS provider, which is the same layout on a mounted share.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    backend: StorageBackend,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `base_path`, creating it if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            backend: StorageBackend::Local,
        })
    }

    /// Filesystem storage over an existing root, reported as `backend`.
    pub(crate) fn existing(base_path: PathBuf, backend: StorageBackend) -> Self {
        LocalStorage { base_path, backend }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys that could resolve outside the base directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);

        if let (Ok(base_canonical), Ok(canonical)) =
            (self.base_path.canonicalize(), path.canonicalize())
        {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    fn backend_type(&self) -> StorageBackend {
        self.backend
    }

    async fn upload(
        &self,
        storage_key: &str,
        data: Bytes,
        trace_id: &str,
    ) -> StorageResult<String> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            backend = %self.backend,
            trace_id = %trace_id,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Filesystem upload successful"
        );

        Ok(storage_key.to_string())
    }

    async fn download(
        &self,
        storage_key: &str,
        trace_id: &str,
    ) -> StorageResult<(Bytes, String)> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(storage_key.to_string()));
            }
            Err(e) => {
                return Err(StorageError::DownloadFailed(format!(
                    "Failed to read file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        tracing::debug!(
            backend = %self.backend,
            trace_id = %trace_id,
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Filesystem download successful"
        );

        let content_type = sniff_mime(&data).to_string();
        Ok((Bytes::from(data), content_type))
    }

    async fn delete(&self, storage_key: &str, trace_id: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(
                    backend = %self.backend,
                    trace_id = %trace_id,
                    key = %storage_key,
                    "Filesystem delete successful"
                );
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, storage_key: &str, _trace_id: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))
    }
}
