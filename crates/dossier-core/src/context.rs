//! Per-request context carried through every orchestrator operation.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::AppError;

/// Trace id plus a cancellation token.
///
/// Cloning shares the token, so a caller that keeps one clone can cancel the
/// operation that received the other.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::with_trace_id(Uuid::new_v4().to_string())
    }

    pub fn with_trace_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// Attach an existing token, e.g. a child of the server's shutdown token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fails with [`AppError::Cancelled`] if the request was cancelled before `stage`.
    pub fn ensure_active(&self, stage: &str) -> Result<(), AppError> {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled(stage.to_string()));
        }
        Ok(())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
