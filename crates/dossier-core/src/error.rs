//! Error types module
//!
//! All orchestration failures are unified under `AppError`. Every variant belongs
//! to one of three kinds (see [`ErrorKind`]) so callers can tell a bad request
//! from a missing record from a backend outage without matching on variants.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like an open circuit
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Coarse classification used for retry and reporting decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied bad input; never retried.
    Validation,
    /// The requested record or object does not exist.
    NotFound,
    /// Backend, database, crypto or runtime failure.
    Operational,
}

/// Metadata describing how an error should be presented at the service boundary.
pub trait ErrorMetadata {
    /// HTTP status code a boundary layer should map this error to
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether a caller may retry the same request later
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Circuit open for {backend}/{operation}")]
    CircuitOpen { backend: String, operation: String },

    #[error("Object missing from storage: {0}")]
    ObjectMissing(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown owner: {0}")]
    UnknownOwner(i64),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation cancelled before {0}")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidInput(_)
            | AppError::UnknownOwner(_)
            | AppError::InvalidCategory(_)
            | AppError::UnsupportedContentType(_)
            | AppError::PayloadTooLarge { .. } => ErrorKind::Validation,
            AppError::NotFound(_) | AppError::ObjectMissing(_) => ErrorKind::NotFound,
            _ => ErrorKind::Operational,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Whether an automatic in-process retry can help.
    ///
    /// Decryption failures, open circuits and cancellations are operational but
    /// repeating them immediately cannot succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_) => true,
            AppError::Encryption(_) => true,
            _ => false,
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::Database(_) => (500, "DATABASE_ERROR", true, LogLevel::Error),
        AppError::Storage(_) => (502, "STORAGE_ERROR", true, LogLevel::Error),
        AppError::CircuitOpen { .. } => (503, "BACKEND_UNAVAILABLE", true, LogLevel::Warn),
        AppError::ObjectMissing(_) => (404, "OBJECT_MISSING", false, LogLevel::Warn),
        AppError::Encryption(_) => (500, "ENCRYPTION_ERROR", true, LogLevel::Error),
        AppError::Decryption(_) => (500, "DECRYPTION_ERROR", false, LogLevel::Error),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        AppError::UnknownOwner(_) => (400, "UNKNOWN_OWNER", false, LogLevel::Debug),
        AppError::InvalidCategory(_) => (400, "INVALID_CATEGORY", false, LogLevel::Debug),
        AppError::UnsupportedContentType(_) => {
            (415, "UNSUPPORTED_CONTENT_TYPE", false, LogLevel::Debug)
        }
        AppError::PayloadTooLarge { .. } => (413, "PAYLOAD_TOO_LARGE", false, LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::Cancelled(_) => (499, "CANCELLED", true, LogLevel::Debug),
        AppError::Config(_) => (500, "CONFIGURATION_ERROR", false, LogLevel::Error),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access file metadata".to_string(),
            AppError::Storage(_) | AppError::CircuitOpen { .. } => {
                "Storage backend unavailable".to_string()
            }
            AppError::Encryption(_) | AppError::Decryption(_) => {
                "Failed to process protected file".to_string()
            }
            AppError::Config(_) | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}
