//! Dossier Core Library
//!
//! This crate provides the domain models, error types, configuration, validation
//! and the file cipher shared by every Dossier component.

pub mod config;
pub mod constants;
pub mod context;
pub mod encryption;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use context::RequestContext;
pub use encryption::FileCipher;
pub use error::{AppError, ErrorKind, ErrorMetadata, LogLevel};
pub use models::{FileCategory, FileMetadata, NewFileMetadata};
pub use storage_types::StorageBackend;
