use std::future::Future;
use std::time::Duration;

use dossier_core::RequestContext;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Owns the periodic job tasks and stops them on shutdown.
pub struct JobScheduler {
    shutdown: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl JobScheduler {
    pub fn new() -> Self {
        Self::with_shutdown(CancellationToken::new())
    }

    /// Use an existing token, e.g. the process-wide shutdown token.
    pub fn with_shutdown(shutdown: CancellationToken) -> Self {
        Self {
            shutdown,
            tasks: Vec::new(),
        }
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn job_count(&self) -> usize {
        self.tasks.len()
    }

    /// Run `job` every `period`, first after one full period. Each run gets a
    /// fresh context whose token is cancelled on shutdown.
    pub fn spawn_every<F, Fut>(&mut self, name: &'static str, period: Duration, job: F)
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(job = name, period_secs = period.as_secs(), "Job scheduled");
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let ctx = RequestContext::new().with_cancellation(shutdown.child_token());
                        tracing::debug!(job = name, trace_id = %ctx.trace_id, "Running job");
                        job(ctx).await;
                    }
                }
            }
            tracing::info!(job = name, "Job stopped");
        });
        self.tasks.push((name, handle));
    }

    /// Cancel every job and wait for the running ones to return.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for (name, handle) in self.tasks {
            if let Err(e) = handle.await {
                tracing::error!(job = name, error = %e, "Job task ended abnormally");
            }
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_once_per_period() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = JobScheduler::new();
        let counter = runs.clone();
        scheduler.spawn_every("count", Duration::from_secs(60), move |_ctx| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_running_jobs() {
        let observed = Arc::new(AtomicUsize::new(0));
        let mut scheduler = JobScheduler::new();
        let seen = observed.clone();
        scheduler.spawn_every("long", Duration::from_secs(1), move |ctx| {
            let seen = seen.clone();
            async move {
                ctx.token().cancelled().await;
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(scheduler.job_count(), 1);

        scheduler.shutdown().await;
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }
}
