//! Background jobs and their scheduler.
//!
//! Job bodies are plain async methods so they can be run once from the CLI or
//! a test, independently of the timer that normally drives them.

mod digest;
mod reconciliation;
mod scheduler;

pub use digest::{DigestJob, DigestOutcome};
pub use reconciliation::{ReconciliationJob, ReconciliationReport};
pub use scheduler::JobScheduler;
