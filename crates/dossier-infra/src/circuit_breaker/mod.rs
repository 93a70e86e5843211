//! Circuit breakers for external storage backends.

mod breaker;
mod registry;

pub use breaker::{BreakerError, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use registry::{CircuitBreakerRegistry, StorageOperation};

#[cfg(test)]
mod tests;
