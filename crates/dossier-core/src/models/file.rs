use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage_types::StorageBackend;

/// Durable record of one stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FileMetadata {
    pub id: i64,
    pub path: String,
    pub original_name: String,
    pub declared_mime_type: Option<String>,
    pub mime_type: String,
    /// Plaintext size in bytes.
    pub size: i64,
    pub storage_backend: StorageBackend,
    /// Base64 IV; present iff the stored object is encrypted.
    pub iv: Option<String>,
    pub sensitive: bool,
    pub owner_id: i64,
    pub association: String,
    pub created_at: DateTime<Utc>,
}

impl FileMetadata {
    pub fn is_encrypted(&self) -> bool {
        self.iv.as_deref().is_some_and(|iv| !iv.is_empty())
    }
}

/// Values for a metadata insert; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFileMetadata {
    pub path: String,
    pub original_name: String,
    pub declared_mime_type: Option<String>,
    pub mime_type: String,
    pub size: i64,
    pub storage_backend: StorageBackend,
    pub iv: Option<String>,
    pub sensitive: bool,
    pub owner_id: i64,
    pub association: String,
}

impl NewFileMetadata {
    pub fn into_metadata(self, id: i64, created_at: DateTime<Utc>) -> FileMetadata {
        FileMetadata {
            id,
            path: self.path,
            original_name: self.original_name,
            declared_mime_type: self.declared_mime_type,
            mime_type: self.mime_type,
            size: self.size,
            storage_backend: self.storage_backend,
            iv: self.iv,
            sensitive: self.sensitive,
            owner_id: self.owner_id,
            association: self.association,
            created_at,
        }
    }
}
