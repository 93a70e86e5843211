//! Construction of every long-lived component from `Config`.

use std::sync::Arc;
use std::time::Duration;

use dossier_core::validation::UploadValidator;
use dossier_core::{Config, FileCipher};
use dossier_db::{
    connect_and_migrate, MetadataStore, OwnerRegistry, PgFileMetadataRepository,
    PgParticipantRepository,
};
use dossier_infra::{
    CircuitBreakerConfig, CircuitBreakerRegistry, MetricsSink, Notifier, RetryConfig,
    RetryExecutor,
};
use dossier_storage::StorageRegistry;

use crate::cache::MetadataCache;
use crate::encryption_worker::EncryptionWorker;
use crate::gateway::StorageGateway;
use crate::jobs::{DigestJob, JobScheduler, ReconciliationJob};
use crate::notifications::NotificationBatch;
use crate::orchestrator::{FileOrchestrator, OrchestratorDeps};

/// The wired service graph.
pub struct Services {
    pub orchestrator: Arc<FileOrchestrator>,
    pub reconciliation: Arc<ReconciliationJob>,
    pub digest: Arc<DigestJob>,
    pub breakers: Arc<CircuitBreakerRegistry>,
    pub cache: Arc<MetadataCache>,
    pub notices: Arc<NotificationBatch>,
}

impl Services {
    /// Connect to PostgreSQL, run migrations and build every component.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;

        let pool = connect_and_migrate(&config.database_url).await?;
        let metadata: Arc<dyn MetadataStore> = Arc::new(PgFileMetadataRepository::new(pool.clone()));
        let owners: Arc<dyn OwnerRegistry> = Arc::new(PgParticipantRepository::new(pool));

        let storage = StorageRegistry::from_config(&config.storage).await?;

        Self::build(
            config,
            Arc::new(storage),
            metadata,
            owners,
            default_notifier(config),
            default_metrics(),
        )
    }

    /// Build the service graph over already constructed stores and providers.
    pub fn build(
        config: &Config,
        storage: Arc<StorageRegistry>,
        metadata: Arc<dyn MetadataStore>,
        owners: Arc<dyn OwnerRegistry>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<dyn MetricsSink>,
    ) -> anyhow::Result<Self> {
        let cipher = FileCipher::from_base64(&config.encryption_key)?;
        let worker = EncryptionWorker::new(cipher, config.crypto_max_concurrency);

        let breaker_config = CircuitBreakerConfig::from(&config.breaker);
        let probe_timeout = breaker_config.call_timeout;
        let breakers = Arc::new(CircuitBreakerRegistry::new(breaker_config));
        let retry = RetryExecutor::new(RetryConfig::from(&config.retry));
        let gateway = Arc::new(StorageGateway::new(
            storage,
            breakers.clone(),
            retry,
            probe_timeout,
        ));

        let cache = Arc::new(MetadataCache::new(
            config.cache.max_entries,
            Duration::from_secs(config.cache.ttl_secs),
        ));
        let notices = Arc::new(NotificationBatch::new(
            config.notifications.max_per_category,
        ));

        let validator = UploadValidator::new(
            config.upload.max_file_size_bytes,
            config.upload.allowed_content_types.clone(),
            config.upload.categories.clone(),
        );

        let orchestrator = Arc::new(FileOrchestrator::new(OrchestratorDeps {
            gateway: gateway.clone(),
            metadata: metadata.clone(),
            owners,
            validator,
            worker,
            cache: cache.clone(),
            notices: notices.clone(),
            notifier: notifier.clone(),
            metrics,
        }));

        let reconciliation = Arc::new(ReconciliationJob::new(
            gateway,
            metadata,
            cache.clone(),
            notices.clone(),
            config.jobs.reconciliation_batch_size,
        ));
        let digest = Arc::new(DigestJob::new(notices.clone(), notifier));

        tracing::info!(
            active_backend = %orchestrator.gateway().active_backend(),
            "Services initialized"
        );

        Ok(Self {
            orchestrator,
            reconciliation,
            digest,
            breakers,
            cache,
            notices,
        })
    }

    /// Register the reconciliation and digest jobs on `scheduler`.
    pub fn schedule_jobs(&self, config: &Config, scheduler: &mut JobScheduler) {
        let reconciliation = self.reconciliation.clone();
        scheduler.spawn_every(
            "reconciliation",
            Duration::from_secs(config.jobs.reconciliation_interval_secs),
            move |ctx| {
                let job = reconciliation.clone();
                async move {
                    job.run(&ctx).await;
                }
            },
        );

        let digest = self.digest.clone();
        scheduler.spawn_every(
            "notification_digest",
            Duration::from_secs(config.jobs.digest_interval_secs),
            move |_ctx| {
                let job = digest.clone();
                async move {
                    job.run().await;
                }
            },
        );
    }
}

/// SMTP when configured, the log otherwise.
#[cfg(feature = "email")]
pub fn default_notifier(config: &Config) -> Arc<dyn Notifier> {
    match dossier_infra::EmailNotifier::from_config(
        &config.smtp,
        &config.notifications,
        RetryConfig::from(&config.retry),
    ) {
        Some(email) => Arc::new(email),
        None => {
            tracing::info!("Admin notifications are written to the log");
            Arc::new(dossier_infra::LogNotifier)
        }
    }
}

#[cfg(not(feature = "email"))]
pub fn default_notifier(_config: &Config) -> Arc<dyn Notifier> {
    tracing::info!("Admin notifications are written to the log");
    Arc::new(dossier_infra::LogNotifier)
}

#[cfg(feature = "observability-opentelemetry")]
pub fn default_metrics() -> Arc<dyn MetricsSink> {
    Arc::new(dossier_infra::OtelMetrics::from_global())
}

#[cfg(not(feature = "observability-opentelemetry"))]
pub fn default_metrics() -> Arc<dyn MetricsSink> {
    Arc::new(dossier_infra::TracingMetrics)
}
