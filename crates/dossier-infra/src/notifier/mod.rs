//! Administrator notifications.

#[cfg(feature = "email")]
mod email;
mod log;

use async_trait::async_trait;

#[cfg(feature = "email")]
pub use email::EmailNotifier;
pub use log::LogNotifier;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notifier configuration error: {0}")]
    Config(String),

    #[error("Failed to send notification: {0}")]
    Send(String),
}

/// Delivers a plain-text message to the administrators.
///
/// Callers treat failures as non-fatal; they are logged and dropped.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}
