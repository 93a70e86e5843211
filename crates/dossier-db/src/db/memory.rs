//! In-memory store implementations for testing without a database.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dossier_core::models::{FileMetadata, NewFileMetadata};
use dossier_core::AppError;
use tokio::sync::Mutex;

use super::{MetadataStore, OwnerRegistry};

#[derive(Default)]
struct Rows {
    next_id: i64,
    by_id: BTreeMap<i64, FileMetadata>,
}

/// Metadata store backed by a `BTreeMap`, with call counters and an outage switch.
#[derive(Clone, Default)]
pub struct InMemoryMetadataStore {
    rows: Arc<Mutex<Rows>>,
    find_calls: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `find_by_id` calls served so far.
    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    /// Make every call fail with a database error until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn all(&self) -> Vec<FileMetadata> {
        self.rows.lock().await.by_id.values().cloned().collect()
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn create(&self, new: NewFileMetadata) -> Result<FileMetadata, AppError> {
        self.check_available()?;
        let mut rows = self.rows.lock().await;

        let duplicate = rows
            .by_id
            .values()
            .any(|m| m.path == new.path && m.storage_backend == new.storage_backend);
        if duplicate {
            return Err(AppError::InvalidInput(
                "A file with this path already exists on this backend".to_string(),
            ));
        }

        rows.next_id += 1;
        let meta = new.into_metadata(rows.next_id, Utc::now());
        rows.by_id.insert(meta.id, meta.clone());
        Ok(meta)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<FileMetadata>, AppError> {
        self.check_available()?;
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().await.by_id.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        self.check_available()?;
        Ok(self.rows.lock().await.by_id.remove(&id).is_some())
    }

    async fn count(&self) -> Result<i64, AppError> {
        self.check_available()?;
        Ok(self.rows.lock().await.by_id.len() as i64)
    }

    async fn list_after(&self, after_id: i64, limit: i64) -> Result<Vec<FileMetadata>, AppError> {
        self.check_available()?;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .rows
            .lock()
            .await
            .by_id
            .range(after_id.saturating_add(1)..)
            .take(limit)
            .map(|(_, m)| m.clone())
            .collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check_available()
    }
}

/// Owner registry over a fixed set of ids.
#[derive(Clone, Default)]
pub struct InMemoryOwnerRegistry {
    owners: Arc<Mutex<HashSet<i64>>>,
}

impl InMemoryOwnerRegistry {
    pub fn with_owners(owners: impl IntoIterator<Item = i64>) -> Self {
        Self {
            owners: Arc::new(Mutex::new(owners.into_iter().collect())),
        }
    }

    pub async fn add_owner(&self, owner_id: i64) {
        self.owners.lock().await.insert(owner_id);
    }
}

#[async_trait]
impl OwnerRegistry for InMemoryOwnerRegistry {
    async fn owner_exists(&self, owner_id: i64) -> Result<bool, AppError> {
        Ok(self.owners.lock().await.contains(&owner_id))
    }
}
