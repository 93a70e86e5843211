//! Daily summary of accumulated notices.

use std::sync::Arc;

use dossier_infra::Notifier;

use crate::notifications::NotificationBatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestOutcome {
    /// Nothing accumulated since the last flush.
    Skipped,
    Sent { notices: usize },
    /// Sending failed; the drained notices were written to the log.
    Failed { notices: usize },
}

pub struct DigestJob {
    notices: Arc<NotificationBatch>,
    notifier: Arc<dyn Notifier>,
}

impl DigestJob {
    pub fn new(notices: Arc<NotificationBatch>, notifier: Arc<dyn Notifier>) -> Self {
        Self { notices, notifier }
    }

    #[tracing::instrument(skip(self), fields(job = "digest"))]
    pub async fn run(&self) -> DigestOutcome {
        let digest = self.notices.drain();
        if digest.is_empty() {
            tracing::debug!("No notices accumulated, skipping digest");
            return DigestOutcome::Skipped;
        }

        let notices = digest.total();
        let body = digest.render();
        match self.notifier.send(&digest.subject(), &body).await {
            Ok(()) => {
                tracing::info!(notices = notices, "Notification digest sent");
                DigestOutcome::Sent { notices }
            }
            Err(e) => {
                tracing::error!(error = %e, notices = notices, digest = %body, "Failed to send notification digest");
                DigestOutcome::Failed { notices }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::NoticeCategory;
    use async_trait::async_trait;
    use dossier_infra::NotifyError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Outbox {
        async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Send("smtp down".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn skips_when_nothing_accumulated() {
        let outbox = Arc::new(Outbox::default());
        let job = DigestJob::new(Arc::new(NotificationBatch::new(10)), outbox.clone());

        assert_eq!(job.run().await, DigestOutcome::Skipped);
        assert!(outbox.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sends_one_summary_and_clears() {
        let batch = Arc::new(NotificationBatch::new(10));
        batch.record(NoticeCategory::SensitiveUpload, "file 1");
        batch.record(NoticeCategory::Failure, "upload of x failed");
        batch.record(NoticeCategory::Deletion, "file 2 deleted");
        let outbox = Arc::new(Outbox::default());
        let job = DigestJob::new(batch.clone(), outbox.clone());

        assert_eq!(job.run().await, DigestOutcome::Sent { notices: 3 });
        let sent = outbox.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("file 1"));
        assert!(sent[0].1.contains("upload of x failed"));
        assert!(sent[0].1.contains("file 2 deleted"));
        assert_eq!(batch.pending(), 0);

        assert_eq!(job.run().await, DigestOutcome::Skipped);
    }

    #[tokio::test]
    async fn failed_send_does_not_requeue() {
        let batch = Arc::new(NotificationBatch::new(10));
        batch.record(NoticeCategory::Failure, "x");
        let outbox = Arc::new(Outbox {
            fail: true,
            ..Default::default()
        });
        let job = DigestJob::new(batch.clone(), outbox);

        assert_eq!(job.run().await, DigestOutcome::Failed { notices: 1 });
        assert_eq!(batch.pending(), 0);
    }
}
