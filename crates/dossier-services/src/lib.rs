//! Dossier Services Layer
//!
//! Coordination of storage providers, encryption, breakers, metadata and
//! notifications:
//! - `FileOrchestrator`: upload, download, delete and health checks
//! - Background reconciliation and notification digest jobs
//! - `setup`: wiring of every component from `Config`

pub mod cache;
pub mod encryption_worker;
pub mod gateway;
pub mod jobs;
pub mod notifications;
pub mod orchestrator;
pub mod setup;

pub use cache::MetadataCache;
pub use encryption_worker::EncryptionWorker;
pub use gateway::StorageGateway;
pub use jobs::{DigestJob, DigestOutcome, JobScheduler, ReconciliationJob, ReconciliationReport};
pub use notifications::{Digest, NoticeCategory, NotificationBatch};
pub use orchestrator::{
    DownloadedFile, FileOrchestrator, HealthReport, OrchestratorDeps, UploadRequest, UploadedFile,
};
pub use setup::Services;
