//! Guarded access to storage providers.
//!
//! Every provider call goes through retry with backoff; calls to external
//! backends additionally pass through the breaker for their (backend,
//! operation) pair. The local backend is called directly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dossier_core::{AppError, RequestContext, StorageBackend};
use dossier_infra::{BreakerError, CircuitBreakerRegistry, RetryExecutor, StorageOperation};
use dossier_storage::keys::health_probe_key;
use dossier_storage::{Storage, StorageError, StorageRegistry, StorageResult};

pub struct StorageGateway {
    registry: Arc<StorageRegistry>,
    breakers: Arc<CircuitBreakerRegistry>,
    retry: RetryExecutor,
    probe_timeout: Duration,
}

impl StorageGateway {
    pub fn new(
        registry: Arc<StorageRegistry>,
        breakers: Arc<CircuitBreakerRegistry>,
        retry: RetryExecutor,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            breakers,
            retry,
            probe_timeout,
        }
    }

    pub fn registry(&self) -> &StorageRegistry {
        &self.registry
    }

    pub fn breakers(&self) -> &CircuitBreakerRegistry {
        &self.breakers
    }

    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    pub fn active_backend(&self) -> StorageBackend {
        self.registry.active_backend()
    }

    /// Run `call` against `backend` with retry, and through the breaker when
    /// the backend is external. Cancellation is checked before every attempt.
    pub async fn call<T, F, Fut>(
        &self,
        backend: StorageBackend,
        operation: StorageOperation,
        ctx: &RequestContext,
        call: F,
    ) -> Result<T, AppError>
    where
        F: Fn(Arc<dyn Storage>) -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        let provider = self.registry.get(backend);
        let breaker = self.breakers.get(backend, operation);
        let stage = format!("{} {}", backend, operation);
        let stage = stage.as_str();

        self.retry
            .execute_with_condition(
                || {
                    let attempt = call(provider.clone());
                    let breaker = breaker.clone();
                    async move {
                        ctx.ensure_active(stage)?;
                        match breaker {
                            Some(breaker) => breaker
                                .call(StorageError::is_operational, || attempt)
                                .await
                                .map_err(|e| breaker_error(e, backend, operation)),
                            None => attempt.await.map_err(AppError::from),
                        }
                    }
                },
                AppError::is_transient,
            )
            .await
    }

    pub async fn upload(
        &self,
        backend: StorageBackend,
        key: &str,
        data: Bytes,
        ctx: &RequestContext,
    ) -> Result<String, AppError> {
        let trace_id = ctx.trace_id.as_str();
        self.call(backend, StorageOperation::Upload, ctx, |provider| {
            let data = data.clone();
            async move { provider.upload(key, data, trace_id).await }
        })
        .await
    }

    pub async fn download(
        &self,
        backend: StorageBackend,
        key: &str,
        ctx: &RequestContext,
    ) -> Result<(Bytes, String), AppError> {
        let trace_id = ctx.trace_id.as_str();
        self.call(backend, StorageOperation::Download, ctx, |provider| async move {
            provider.download(key, trace_id).await
        })
        .await
    }

    pub async fn delete(
        &self,
        backend: StorageBackend,
        key: &str,
        ctx: &RequestContext,
    ) -> Result<(), AppError> {
        let trace_id = ctx.trace_id.as_str();
        self.call(backend, StorageOperation::Delete, ctx, |provider| async move {
            provider.delete(key, trace_id).await
        })
        .await
    }

    /// Presence check. Providers without an existence capability are probed
    /// with a download; both run under the `exists` breaker.
    pub async fn exists(
        &self,
        backend: StorageBackend,
        key: &str,
        ctx: &RequestContext,
    ) -> Result<bool, AppError> {
        let trace_id = ctx.trace_id.as_str();
        self.call(backend, StorageOperation::Exists, ctx, |provider| async move {
            match provider.exists(key, trace_id).await {
                Err(StorageError::Unsupported(_)) => match provider.download(key, trace_id).await {
                    Ok(_) => Ok(true),
                    Err(StorageError::NotFound(_)) => Ok(false),
                    Err(e) => Err(e),
                },
                other => other,
            }
        })
        .await
    }

    /// Health of one provider. Probes bypass the breakers so that an open
    /// circuit does not hide a recovered backend, but are bounded in time.
    pub async fn probe(&self, backend: StorageBackend, trace_id: &str) -> bool {
        let provider = self.registry.get(backend);
        match tokio::time::timeout(self.probe_timeout, probe_provider(provider.as_ref(), trace_id))
            .await
        {
            Ok(healthy) => healthy,
            Err(_) => {
                tracing::warn!(
                    backend = %backend,
                    trace_id = %trace_id,
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "Storage health probe timed out"
                );
                false
            }
        }
    }
}

async fn probe_provider(provider: &dyn Storage, trace_id: &str) -> bool {
    let backend = provider.backend_type();
    match provider.health_check(trace_id).await {
        Ok(healthy) => healthy,
        Err(StorageError::Unsupported(_)) => {
            let key = health_probe_key();
            let result = match provider
                .upload(&key, Bytes::from_static(b"ok"), trace_id)
                .await
            {
                Ok(_) => provider.delete(&key, trace_id).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(backend = %backend, trace_id = %trace_id, error = %e, "Storage health probe failed");
                    false
                }
            }
        }
        Err(e) => {
            tracing::warn!(backend = %backend, trace_id = %trace_id, error = %e, "Storage health check failed");
            false
        }
    }
}

fn breaker_error(
    err: BreakerError<StorageError>,
    backend: StorageBackend,
    operation: StorageOperation,
) -> AppError {
    match err {
        BreakerError::Open => AppError::CircuitOpen {
            backend: backend.to_string(),
            operation: operation.to_string(),
        },
        BreakerError::Timeout(after) => AppError::Storage(format!(
            "{} {} timed out after {:?}",
            backend, operation, after
        )),
        BreakerError::Inner(e) => e.into(),
    }
}
