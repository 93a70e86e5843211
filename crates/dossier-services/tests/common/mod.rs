#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use dossier_core::config::{
    BreakerSettings, CacheConfig, JobsConfig, NotificationConfig, RetrySettings, SmtpConfig,
    StorageConfig, UploadConfig,
};
use dossier_core::{Config, StorageBackend};
use dossier_core::models::{FileMetadata, NewFileMetadata};
use dossier_core::AppError;
use dossier_db::{InMemoryMetadataStore, InMemoryOwnerRegistry, MetadataStore};
use dossier_infra::{MetricsSink, Notifier, NotifyError};
use dossier_services::{Services, UploadRequest};
use dossier_storage::{CloudStorage, Storage, StorageError, StorageRegistry, StorageResult};
use object_store::memory::InMemory;
use tokio::sync::Notify;

pub const OWNER: i64 = 1;

pub fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        database_url: "postgres://localhost/dossier_test".to_string(),
        encryption_key: general_purpose::STANDARD.encode([42u8; 32]),
        crypto_max_concurrency: 2,
        storage: StorageConfig::default(),
        upload: UploadConfig::default(),
        cache: CacheConfig::default(),
        retry: RetrySettings {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 5,
        },
        breaker: BreakerSettings::default(),
        notifications: NotificationConfig::default(),
        smtp: SmtpConfig::default(),
        jobs: JobsConfig {
            reconciliation_batch_size: 2,
            ..JobsConfig::default()
        },
    }
}

pub fn png(size: usize) -> Bytes {
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend((0..size - 8).map(|i| (i % 251) as u8));
    Bytes::from(data)
}

pub fn pdf(size: usize) -> Bytes {
    let mut data = b"%PDF-1.7\n".to_vec();
    data.extend((0..size - data.len()).map(|i| b'a' + (i % 26) as u8));
    Bytes::from(data)
}

pub fn request(data: Bytes, category: &str, sensitive: bool) -> UploadRequest {
    UploadRequest {
        data,
        original_name: "scan.bin".to_string(),
        declared_mime_type: None,
        owner_id: OWNER,
        category: category.to_string(),
        sensitive,
    }
}

/// Wraps a provider, counting calls that reach it and failing them on demand.
pub struct FlakyStorage {
    inner: Arc<dyn Storage>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FlakyStorage {
    pub fn new(inner: Arc<dyn Storage>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Direct access to the wrapped provider, bypassing failure injection.
    pub fn inner(&self) -> &Arc<dyn Storage> {
        &self.inner
    }

    fn enter(&self) -> StorageResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::BackendError("injected outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }

    async fn upload(&self, key: &str, data: Bytes, trace_id: &str) -> StorageResult<String> {
        self.enter()?;
        self.inner.upload(key, data, trace_id).await
    }

    async fn download(&self, key: &str, trace_id: &str) -> StorageResult<(Bytes, String)> {
        self.enter()?;
        self.inner.download(key, trace_id).await
    }

    async fn delete(&self, key: &str, trace_id: &str) -> StorageResult<()> {
        self.enter()?;
        self.inner.delete(key, trace_id).await
    }

    async fn exists(&self, key: &str, trace_id: &str) -> StorageResult<bool> {
        self.enter()?;
        self.inner.exists(key, trace_id).await
    }
}

#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<(String, String)>>,
}

impl Outbox {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait for background notification tasks to deliver `count` messages.
    pub async fn wait_for(&self, count: usize) -> Vec<(String, String)> {
        for _ in 0..100 {
            if self.sent.lock().unwrap().len() >= count {
                break;
            }
            tokio::task::yield_now().await;
        }
        self.sent()
    }
}

#[async_trait]
impl Notifier for Outbox {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMetrics {
    durations: Mutex<Vec<(String, String, bool)>>,
    errors: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMetrics {
    pub fn durations(&self) -> Vec<(String, String, bool)> {
        self.durations.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<(String, String, String)> {
        self.errors.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn record_duration(&self, operation: &str, backend: &str, _duration: Duration, success: bool) {
        self.durations
            .lock()
            .unwrap()
            .push((operation.to_string(), backend.to_string(), success));
    }

    fn record_error(&self, operation: &str, backend: &str, error_code: &str) {
        self.errors.lock().unwrap().push((
            operation.to_string(),
            backend.to_string(),
            error_code.to_string(),
        ));
    }
}

pub struct Harness {
    pub services: Services,
    pub metadata: InMemoryMetadataStore,
    pub local: Arc<FlakyStorage>,
    pub remote: Arc<FlakyStorage>,
    pub outbox: Arc<Outbox>,
    pub metrics: Arc<RecordingMetrics>,
}

/// Services over in-memory stores, with S3 as the active backend.
pub fn harness() -> Harness {
    harness_with(test_config(), StorageBackend::S3)
}

pub fn harness_with(config: Config, active: StorageBackend) -> Harness {
    let metadata = InMemoryMetadataStore::new();
    harness_over(
        config,
        active,
        metadata.clone(),
        Arc::new(metadata),
        memory_provider(StorageBackend::S3, "test-bucket"),
    )
}

/// Cloud provider over `object_store`'s in-memory store.
pub fn memory_provider(backend: StorageBackend, container: &str) -> Arc<dyn Storage> {
    Arc::new(CloudStorage::from_store(
        backend,
        container,
        Arc::new(InMemory::new()),
    ))
}

/// Services over `store` (which must read and write `metadata`) and a remote
/// S3 provider wrapping `remote`.
pub fn harness_over(
    config: Config,
    active: StorageBackend,
    metadata: InMemoryMetadataStore,
    store: Arc<dyn MetadataStore>,
    remote: Arc<dyn Storage>,
) -> Harness {
    let local = Arc::new(FlakyStorage::new(memory_provider(
        StorageBackend::Local,
        "local",
    )));
    let remote = Arc::new(FlakyStorage::new(remote));

    let mut providers: HashMap<StorageBackend, Arc<dyn Storage>> = HashMap::new();
    providers.insert(StorageBackend::Local, local.clone());
    providers.insert(StorageBackend::S3, remote.clone());
    let registry = StorageRegistry::new(providers, active).unwrap();

    let owners = InMemoryOwnerRegistry::with_owners([OWNER]);
    let outbox = Arc::new(Outbox::default());
    let metrics = Arc::new(RecordingMetrics::default());

    let services = Services::build(
        &config,
        Arc::new(registry),
        store,
        Arc::new(owners),
        outbox.clone(),
        metrics.clone(),
    )
    .unwrap();

    Harness {
        services,
        metadata,
        local,
        remote,
        outbox,
        metrics,
    }
}

/// Provider with only the required capabilities; `exists` and
/// `health_check` keep their `Unsupported` defaults.
pub struct BasicStorage {
    inner: Arc<dyn Storage>,
}

impl BasicStorage {
    pub fn new(inner: Arc<dyn Storage>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Storage for BasicStorage {
    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }

    async fn upload(&self, key: &str, data: Bytes, trace_id: &str) -> StorageResult<String> {
        self.inner.upload(key, data, trace_id).await
    }

    async fn download(&self, key: &str, trace_id: &str) -> StorageResult<(Bytes, String)> {
        self.inner.download(key, trace_id).await
    }

    async fn delete(&self, key: &str, trace_id: &str) -> StorageResult<()> {
        self.inner.delete(key, trace_id).await
    }
}

/// Metadata store whose next `find_by_id`, once armed, stops after reading the
/// row and waits to be released.
pub struct GatedMetadataStore {
    inner: InMemoryMetadataStore,
    armed: AtomicBool,
    reached: Notify,
    release: Notify,
}

impl GatedMetadataStore {
    pub fn new(inner: InMemoryMetadataStore) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
            reached: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Wait until the armed lookup has read its row.
    pub async fn reached(&self) {
        self.reached.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl MetadataStore for GatedMetadataStore {
    async fn create(&self, new: NewFileMetadata) -> Result<FileMetadata, AppError> {
        self.inner.create(new).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<FileMetadata>, AppError> {
        let row = self.inner.find_by_id(id).await?;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        self.inner.delete(id).await
    }

    async fn count(&self) -> Result<i64, AppError> {
        self.inner.count().await
    }

    async fn list_after(&self, after_id: i64, limit: i64) -> Result<Vec<FileMetadata>, AppError> {
        self.inner.list_after(after_id, limit).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.inner.ping().await
    }
}
