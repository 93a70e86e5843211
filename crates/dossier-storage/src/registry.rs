//! Named set of storage providers.
//!
//! All five backends are constructed once at startup. A backend that cannot be
//! built is registered as an [`UnavailableStorage`] so lookups by recorded
//! backend name never fail.

use std::collections::HashMap;
use std::sync::Arc;

use dossier_core::config::StorageConfig;

use crate::local::LocalStorage;
use crate::nas::NasStorage;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::unavailable::UnavailableStorage;
use crate::StorageBackend;

pub struct StorageRegistry {
    providers: HashMap<StorageBackend, Arc<dyn Storage>>,
    active: StorageBackend,
}

impl StorageRegistry {
    /// Build from explicit providers; backends without one are registered as unavailable.
    ///
    /// # Errors
    /// - the local backend or the active backend is missing
    pub fn new(
        providers: HashMap<StorageBackend, Arc<dyn Storage>>,
        active: StorageBackend,
    ) -> StorageResult<Self> {
        if !providers.contains_key(&StorageBackend::Local) {
            return Err(StorageError::ConfigError(
                "Local storage is required for fallback writes".to_string(),
            ));
        }
        if !providers.contains_key(&active) {
            return Err(StorageError::ConfigError(format!(
                "Active storage backend '{}' has no provider",
                active
            )));
        }

        let mut providers = providers;
        for backend in StorageBackend::ALL {
            providers.entry(backend).or_insert_with(|| {
                Arc::new(UnavailableStorage::new(backend, "not registered"))
            });
        }

        Ok(Self { providers, active })
    }

    /// Construct every backend from configuration.
    ///
    /// Only the local backend must succeed; the others degrade to unavailable
    /// providers with the construction error as the reason.
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let mut providers: HashMap<StorageBackend, Arc<dyn Storage>> = HashMap::new();

        let local = build_provider(StorageBackend::Local, config).await?;
        providers.insert(StorageBackend::Local, local);

        for backend in [
            StorageBackend::Nas,
            StorageBackend::S3,
            StorageBackend::Gcs,
            StorageBackend::Azure,
        ] {
            let provider = match build_provider(backend, config).await {
                Ok(provider) => provider,
                Err(e) => {
                    if backend == config.active_backend {
                        tracing::error!(backend = %backend, error = %e, "Active storage backend unavailable");
                    } else {
                        tracing::debug!(backend = %backend, error = %e, "Storage backend not configured");
                    }
                    Arc::new(UnavailableStorage::new(backend, e.to_string())) as Arc<dyn Storage>
                }
            };
            providers.insert(backend, provider);
        }

        tracing::info!(active = %config.active_backend, "Storage registry initialized");

        Self::new(providers, config.active_backend)
    }

    /// Provider for a recorded backend name.
    pub fn get(&self, backend: StorageBackend) -> Arc<dyn Storage> {
        match self.providers.get(&backend) {
            Some(provider) => provider.clone(),
            None => Arc::new(UnavailableStorage::new(backend, "not registered")),
        }
    }

    pub fn active(&self) -> Arc<dyn Storage> {
        self.get(self.active)
    }

    pub fn active_backend(&self) -> StorageBackend {
        self.active
    }

    pub fn local(&self) -> Arc<dyn Storage> {
        self.get(StorageBackend::Local)
    }

    /// All providers in a stable order.
    pub fn all(&self) -> Vec<(StorageBackend, Arc<dyn Storage>)> {
        StorageBackend::ALL
            .into_iter()
            .map(|backend| (backend, self.get(backend)))
            .collect()
    }
}

async fn build_provider(
    backend: StorageBackend,
    config: &StorageConfig,
) -> StorageResult<Arc<dyn Storage>> {
    match backend {
        StorageBackend::Local => Ok(Arc::new(
            LocalStorage::new(config.local_storage_path.clone()).await?,
        )),
        StorageBackend::Nas => {
            let mount = config.nas_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("NAS_STORAGE_PATH not configured".to_string())
            })?;
            Ok(Arc::new(NasStorage::new(mount).await?))
        }
        #[cfg(feature = "storage-cloud")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .as_deref()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config.s3_region.as_deref().ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;
            Ok(Arc::new(crate::cloud::s3::connect(
                bucket,
                region,
                config.s3_endpoint.as_deref(),
            )?))
        }
        #[cfg(feature = "storage-cloud")]
        StorageBackend::Gcs => {
            let bucket = config
                .gcs_bucket
                .as_deref()
                .ok_or_else(|| StorageError::ConfigError("GCS_BUCKET not configured".to_string()))?;
            Ok(Arc::new(crate::cloud::gcs::connect(bucket)?))
        }
        #[cfg(feature = "storage-cloud")]
        StorageBackend::Azure => {
            let account = config.azure_account.as_deref().ok_or_else(|| {
                StorageError::ConfigError("AZURE_ACCOUNT not configured".to_string())
            })?;
            let container = config.azure_container.as_deref().ok_or_else(|| {
                StorageError::ConfigError("AZURE_CONTAINER not configured".to_string())
            })?;
            Ok(Arc::new(crate::cloud::azure::connect(account, container)?))
        }
        #[cfg(not(feature = "storage-cloud"))]
        StorageBackend::S3 | StorageBackend::Gcs | StorageBackend::Azure => {
            Err(StorageError::ConfigError(
                "Cloud storage not available (storage-cloud feature not enabled)".to_string(),
            ))
        }
    }
}
