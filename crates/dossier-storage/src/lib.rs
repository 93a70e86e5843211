//! Dossier Storage Library
//!
//! Storage abstraction and the five providers: local filesystem, NAS, S3,
//! Google Cloud Storage and Azure Blob.
//!
//! # Storage key format
//!
//! All backends use `{association}/{owner_id}/{uuid}.{ext}`. Fallback copies of
//! failed uploads are written to the local backend under `fallback/{key}`.
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all backends stay consistent.

#[cfg(feature = "storage-cloud")]
pub mod cloud;
pub mod keys;
pub mod local;
pub mod nas;
pub mod registry;
pub mod traits;
pub mod unavailable;

// Re-export commonly used types
#[cfg(feature = "storage-cloud")]
pub use cloud::CloudStorage;
pub use dossier_core::StorageBackend;
pub use local::LocalStorage;
pub use nas::NasStorage;
pub use registry::StorageRegistry;
pub use traits::{Storage, StorageError, StorageResult};
pub use unavailable::UnavailableStorage;
