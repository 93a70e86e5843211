use std::collections::BTreeMap;

use dossier_core::{RequestContext, StorageBackend};
use futures::future::join_all;

use super::{FileOrchestrator, HealthReport};

impl FileOrchestrator {
    /// Probe every provider and the metadata store concurrently.
    #[tracing::instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn check_health(&self, ctx: &RequestContext) -> HealthReport {
        let trace_id = ctx.trace_id.as_str();

        let providers = join_all(StorageBackend::ALL.into_iter().map(|backend| async move {
            (backend.to_string(), self.gateway.probe(backend, trace_id).await)
        }));
        let store = async {
            match self.metadata.ping().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(trace_id = %trace_id, error = %e, "Metadata store health check failed");
                    false
                }
            }
        };

        let (providers, metadata_store) = tokio::join!(providers, store);
        let report = HealthReport {
            providers: providers.into_iter().collect::<BTreeMap<_, _>>(),
            metadata_store,
            active_backend: self.gateway.active_backend().to_string(),
        };

        tracing::info!(
            healthy = report.is_healthy(),
            metadata_store = report.metadata_store,
            "Health check completed"
        );
        report
    }
}
