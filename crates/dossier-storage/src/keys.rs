//! Shared key generation for storage backends.
//!
//! Key format: `{association}/{owner_id}/{uuid}.{ext}`. Fallback copies live
//! under `fallback/` with the original key appended.

use dossier_core::constants::{FALLBACK_PREFIX, HEALTH_PROBE_PREFIX};
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Generate a storage key for a new object.
///
/// All backends must use this format for consistency.
pub fn generate_storage_key(association: &str, owner_id: i64, extension: &str) -> String {
    format!(
        "{}/{}/{}.{}",
        association,
        owner_id,
        Uuid::new_v4(),
        extension
    )
}

/// Key used for the local fallback copy of a failed upload.
pub fn fallback_key(storage_key: &str) -> String {
    format!("{}/{}", FALLBACK_PREFIX, storage_key)
}

/// Disposable key for health probes.
pub fn health_probe_key() -> String {
    format!("{}/{}.probe", HEALTH_PROBE_PREFIX, Uuid::new_v4())
}

/// Reject keys that could escape a backend's root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.contains("..") || storage_key.starts_with('/') || storage_key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
