//! Dossier Infrastructure Library
//!
//! Shared infrastructure used by the orchestrator and background jobs:
//! - Telemetry initialization
//! - Retry with exponential backoff
//! - Circuit breakers per backend and operation
//! - Metrics sinks
//! - Administrator notifications

pub mod circuit_breaker;
pub mod metrics;
pub mod notifier;
pub mod retry;
pub mod telemetry;

// Re-export commonly used types
pub use circuit_breaker::{
    BreakerError, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState,
    StorageOperation,
};
pub use metrics::{MetricsSink, TracingMetrics};
#[cfg(feature = "observability-opentelemetry")]
pub use metrics::OtelMetrics;
#[cfg(feature = "email")]
pub use notifier::EmailNotifier;
pub use notifier::{LogNotifier, Notifier, NotifyError};
pub use retry::{RetryConfig, RetryExecutor};
pub use telemetry::{init_telemetry, shutdown_telemetry};
