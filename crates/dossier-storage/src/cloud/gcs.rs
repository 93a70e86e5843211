use super::CloudStorage;
use crate::traits::{StorageError, StorageResult};
use crate::StorageBackend;
use object_store::gcp::GoogleCloudStorageBuilder;
use std::sync::Arc;

/// Build the Google Cloud Storage provider.
///
/// Service account credentials are read from `GOOGLE_SERVICE_ACCOUNT` and friends.
pub fn connect(bucket: &str) -> StorageResult<CloudStorage> {
    let store = GoogleCloudStorageBuilder::from_env()
        .with_bucket_name(bucket)
        .build()
        .map_err(|e| StorageError::ConfigError(e.to_string()))?;

    tracing::info!(bucket = %bucket, "GCS storage configured");

    Ok(CloudStorage::from_store(
        StorageBackend::Gcs,
        bucket,
        Arc::new(store),
    ))
}
