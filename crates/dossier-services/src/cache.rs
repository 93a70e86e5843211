//! Bounded TTL cache of file metadata in front of the metadata store.
//!
//! The cache is never a source of truth: a miss, an expired entry or an entry
//! evicted by a concurrent writer all fall through to the store.
//!
//! Every invalidation bumps a cache-wide epoch. A reader that loaded a record
//! from the store snapshots the epoch first and inserts with
//! [`MetadataCache::insert_if_current`], so a record deleted while it was being
//! read never reappears in the cache.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use dossier_core::FileMetadata;
use lru::LruCache;
use tokio::time::Instant;

struct CacheEntry {
    metadata: FileMetadata,
    inserted_at: Instant,
}

struct Entries {
    lru: LruCache<i64, CacheEntry>,
    epoch: u64,
}

pub struct MetadataCache {
    entries: Mutex<Entries>,
    ttl: Duration,
}

impl MetadataCache {
    /// `capacity` of zero is treated as one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries {
                lru: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
                epoch: 0,
            }),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns `None` if not cached or expired.
    pub fn get(&self, file_id: i64) -> Option<FileMetadata> {
        let mut entries = self.lock();
        if let Some(entry) = entries.lru.get(&file_id) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.metadata.clone());
            }
            entries.lru.pop(&file_id);
        }
        None
    }

    /// Insert a record the caller just wrote to the store.
    pub fn insert(&self, metadata: FileMetadata) {
        Self::put(&mut self.lock(), metadata);
    }

    /// Snapshot to take before reading a record from the store.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Insert a record read from the store, unless an invalidation happened
    /// since `epoch` was taken. Returns whether the record was cached.
    pub fn insert_if_current(&self, metadata: FileMetadata, epoch: u64) -> bool {
        let mut entries = self.lock();
        if entries.epoch != epoch {
            return false;
        }
        Self::put(&mut entries, metadata);
        true
    }

    pub fn invalidate(&self, file_id: i64) {
        let mut entries = self.lock();
        entries.epoch = entries.epoch.wrapping_add(1);
        entries.lru.pop(&file_id);
    }

    pub fn len(&self) -> usize {
        self.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put(entries: &mut Entries, metadata: FileMetadata) {
        entries.lru.put(
            metadata.id,
            CacheEntry {
                metadata,
                inserted_at: Instant::now(),
            },
        );
    }
}
