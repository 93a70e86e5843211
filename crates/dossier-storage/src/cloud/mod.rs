//! Cloud object stores (S3, GCS, Azure Blob) behind a single provider type.
//!
//! Each backend only differs in how its `object_store` client is built; the
//! request handling, error mapping and logging are shared here.

pub mod azure;
pub mod gcs;
pub mod s3;

use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use dossier_core::constants::DEFAULT_CONTENT_TYPE;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{Attribute, ObjectStoreExt, PutPayload, Result as ObjectResult};
use std::sync::Arc;

/// Provider over any `object_store` client.
#[derive(Clone)]
pub struct CloudStorage {
    store: Arc<dyn object_store::ObjectStore>,
    backend: StorageBackend,
    /// Bucket or container name, for logs.
    container: String,
}

impl std::fmt::Debug for CloudStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudStorage")
            .field("backend", &self.backend)
            .field("container", &self.container)
            .finish()
    }
}

impl CloudStorage {
    /// Wrap an already built client, e.g. `object_store::memory::InMemory` in tests.
    pub fn from_store(
        backend: StorageBackend,
        container: impl Into<String>,
        store: Arc<dyn object_store::ObjectStore>,
    ) -> Self {
        Self {
            store,
            backend,
            container: container.into(),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }
}

#[async_trait]
impl Storage for CloudStorage {
    fn backend_type(&self) -> StorageBackend {
        self.backend
    }

    async fn upload(
        &self,
        storage_key: &str,
        data: Bytes,
        trace_id: &str,
    ) -> StorageResult<String> {
        crate::keys::validate_key(storage_key)?;
        let size = data.len() as u64;
        let location = Path::from(storage_key.to_string());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(data)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                backend = %self.backend,
                container = %self.container,
                trace_id = %trace_id,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Cloud upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            backend = %self.backend,
            container = %self.container,
            trace_id = %trace_id,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Cloud upload successful"
        );

        Ok(storage_key.to_string())
    }

    async fn download(
        &self,
        storage_key: &str,
        trace_id: &str,
    ) -> StorageResult<(Bytes, String)> {
        crate::keys::validate_key(storage_key)?;
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    backend = %self.backend,
                    container = %self.container,
                    trace_id = %trace_id,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Cloud download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| value.to_string())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::debug!(
            backend = %self.backend,
            trace_id = %trace_id,
            key = %storage_key,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Cloud download successful"
        );

        Ok((bytes, content_type))
    }

    async fn delete(&self, storage_key: &str, trace_id: &str) -> StorageResult<()> {
        crate::keys::validate_key(storage_key)?;
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    backend = %self.backend,
                    container = %self.container,
                    trace_id = %trace_id,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Cloud delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            backend = %self.backend,
            trace_id = %trace_id,
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Cloud delete successful"
        );

        Ok(())
    }

    async fn exists(&self, storage_key: &str, _trace_id: &str) -> StorageResult<bool> {
        crate::keys::validate_key(storage_key)?;
        let location = Path::from(storage_key.to_string());

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }
}
