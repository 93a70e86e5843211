//! Dossier database layer
//!
//! Metadata store and owner registry contracts with their PostgreSQL
//! implementations. In-memory implementations are available behind the
//! `test-helpers` feature.

pub mod db;

pub use db::{
    connect_and_migrate, MetadataStore, OwnerRegistry, PgFileMetadataRepository,
    PgParticipantRepository,
};
#[cfg(any(test, feature = "test-helpers"))]
pub use db::memory::{InMemoryMetadataStore, InMemoryOwnerRegistry};
