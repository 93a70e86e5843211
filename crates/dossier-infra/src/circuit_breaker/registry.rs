use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dossier_core::StorageBackend;

use super::breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

/// Provider operations that are guarded individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOperation {
    Upload,
    Download,
    Delete,
    Exists,
}

impl StorageOperation {
    pub const ALL: [StorageOperation; 4] = [
        StorageOperation::Upload,
        StorageOperation::Download,
        StorageOperation::Delete,
        StorageOperation::Exists,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::Upload => "upload",
            StorageOperation::Download => "download",
            StorageOperation::Delete => "delete",
            StorageOperation::Exists => "exists",
        }
    }
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One breaker per external backend and operation, built up front.
///
/// The local backend has no breakers.
pub struct CircuitBreakerRegistry {
    breakers: HashMap<(StorageBackend, StorageOperation), Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let mut breakers = HashMap::new();
        for backend in StorageBackend::ALL.into_iter().filter(|b| b.is_external()) {
            for operation in StorageOperation::ALL {
                let name = format!("{}:{}", backend, operation);
                breakers.insert(
                    (backend, operation),
                    Arc::new(CircuitBreaker::new(name, config.clone())),
                );
            }
        }
        Self { breakers }
    }

    /// Breaker guarding `operation` on `backend`, or `None` for the local backend.
    pub fn get(
        &self,
        backend: StorageBackend,
        operation: StorageOperation,
    ) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(&(backend, operation)).cloned()
    }

    /// Snapshot of every breaker state, keyed by breaker name.
    pub fn states(&self) -> Vec<(String, CircuitState)> {
        let mut states: Vec<_> = self
            .breakers
            .values()
            .map(|b| (b.name().to_string(), b.state()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }
}
