use async_trait::async_trait;

use super::{Notifier, NotifyError};

/// Writes notifications to the log. Used when SMTP delivery is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        tracing::warn!(subject = %subject, body = %body, "Admin notification");
        Ok(())
    }
}
