use super::CloudStorage;
use crate::traits::{StorageError, StorageResult};
use crate::StorageBackend;
use object_store::aws::AmazonS3Builder;
use std::sync::Arc;

/// Build the S3 provider.
///
/// Credentials come from the standard AWS environment variables.
/// `endpoint` selects an S3-compatible provider (e.g. "http://localhost:9000" for MinIO).
pub fn connect(
    bucket: &str,
    region: &str,
    endpoint: Option<&str>,
) -> StorageResult<CloudStorage> {
    let mut builder = AmazonS3Builder::from_env()
        .with_region(region)
        .with_bucket_name(bucket);

    if let Some(endpoint) = endpoint {
        let allow_http = endpoint.starts_with("http://");
        builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
    }

    let store = builder
        .build()
        .map_err(|e| StorageError::ConfigError(e.to_string()))?;

    tracing::info!(bucket = %bucket, region = %region, "S3 storage configured");

    Ok(CloudStorage::from_store(
        StorageBackend::S3,
        bucket,
        Arc::new(store),
    ))
}
