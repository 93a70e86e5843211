use super::CloudStorage;
use crate::traits::{StorageError, StorageResult};
use crate::StorageBackend;
use object_store::azure::MicrosoftAzureBuilder;
use std::sync::Arc;

/// Build the Azure Blob provider. The access key comes from `AZURE_STORAGE_ACCESS_KEY`.
pub fn connect(account: &str, container: &str) -> StorageResult<CloudStorage> {
    let store = MicrosoftAzureBuilder::from_env()
        .with_account(account)
        .with_container_name(container)
        .build()
        .map_err(|e| StorageError::ConfigError(e.to_string()))?;

    tracing::info!(account = %account, container = %container, "Azure storage configured");

    Ok(CloudStorage::from_store(
        StorageBackend::Azure,
        container,
        Arc::new(store),
    ))
}
