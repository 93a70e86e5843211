//! Operation metrics: a duration histogram and an error counter, both keyed by
//! operation and storage backend.

use std::time::Duration;

#[cfg(feature = "observability-opentelemetry")]
use opentelemetry::{
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

pub trait MetricsSink: Send + Sync {
    fn record_duration(&self, operation: &str, backend: &str, duration: Duration, success: bool);

    fn record_error(&self, operation: &str, backend: &str, error_code: &str);
}

/// Emits metrics as `tracing` events under the `dossier::metrics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn record_duration(&self, operation: &str, backend: &str, duration: Duration, success: bool) {
        tracing::debug!(
            target: "dossier::metrics",
            operation = %operation,
            backend = %backend,
            duration_ms = duration.as_secs_f64() * 1000.0,
            success = success,
            "operation.duration"
        );
    }

    fn record_error(&self, operation: &str, backend: &str, error_code: &str) {
        tracing::debug!(
            target: "dossier::metrics",
            operation = %operation,
            backend = %backend,
            error_code = %error_code,
            "operation.error"
        );
    }
}

/// Metrics recorded through the globally installed OpenTelemetry meter provider.
#[cfg(feature = "observability-opentelemetry")]
pub struct OtelMetrics {
    operation_duration: Histogram<f64>,
    error_counter: Counter<u64>,
}

#[cfg(feature = "observability-opentelemetry")]
impl OtelMetrics {
    pub fn new(meter: Meter) -> Self {
        let operation_duration = meter
            .f64_histogram("dossier.storage.operation.duration")
            .with_description("File operation duration in seconds")
            .with_unit("s")
            .build();

        let error_counter = meter
            .u64_counter("dossier.storage.operation.errors")
            .with_description("Total number of failed file operations")
            .build();

        Self {
            operation_duration,
            error_counter,
        }
    }

    pub fn from_global() -> Self {
        Self::new(opentelemetry::global::meter("dossier"))
    }
}

#[cfg(feature = "observability-opentelemetry")]
impl MetricsSink for OtelMetrics {
    fn record_duration(&self, operation: &str, backend: &str, duration: Duration, success: bool) {
        self.operation_duration.record(
            duration.as_secs_f64(),
            &[
                KeyValue::new("operation", operation.to_string()),
                KeyValue::new("backend", backend.to_string()),
                KeyValue::new("success", success),
            ],
        );
    }

    fn record_error(&self, operation: &str, backend: &str, error_code: &str) {
        self.error_counter.add(
            1,
            &[
                KeyValue::new("operation", operation.to_string()),
                KeyValue::new("backend", backend.to_string()),
                KeyValue::new("error_code", error_code.to_string()),
            ],
        );
    }
}
