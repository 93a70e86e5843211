use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use dossier_core::config::BreakerSettings;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Minimum calls in the rolling window before the error rate is considered.
    pub volume_threshold: usize,
    /// Open when the failure percentage in the window exceeds this value.
    pub error_threshold_percentage: f64,
    pub rolling_window: Duration,
    /// How long the circuit stays open before admitting a trial call.
    pub reset_timeout: Duration,
    /// Upper bound for a single guarded call; exceeding it counts as a failure.
    pub call_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::from(&BreakerSettings::default())
    }
}

impl From<&BreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &BreakerSettings) -> Self {
        Self {
            volume_threshold: settings.volume_threshold.max(1),
            error_threshold_percentage: settings.error_threshold_percentage,
            rolling_window: Duration::from_secs(settings.rolling_window_secs),
            reset_timeout: Duration::from_secs(settings.reset_timeout_secs),
            call_timeout: Duration::from_secs(settings.call_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    #[error("circuit open")]
    Open,

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Inner(E),
}

struct BreakerState {
    state: CircuitState,
    /// (completed_at, failed)
    outcomes: VecDeque<(Instant, bool)>,
    opened_at: Option<Instant>,
    last_transition: Instant,
    trial_in_flight: bool,
}

/// Breaker for one (backend, operation) pair.
///
/// Updates are serialized under a mutex that is never held across an await.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

/// Admission ticket for one call. Dropping an unfinished trial call (e.g. the
/// request was cancelled) frees the half-open slot without deciding the state.
struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            self.breaker.lock().trial_in_flight = false;
        }
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                outcomes: VecDeque::new(),
                opened_at: None,
                last_transition: Instant::now(),
                trial_in_flight: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current state, with an expired open period reported as half-open.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.refresh(&mut inner, Instant::now());
        inner.state
    }

    /// Time of the last state transition.
    pub fn last_transition(&self) -> Instant {
        self.lock().last_transition
    }

    /// Run `call` through the breaker.
    ///
    /// `is_failure` decides which inner errors count against the backend;
    /// errors it rejects are recorded as successes.
    pub async fn call<T, E, F, Fut>(
        &self,
        is_failure: impl Fn(&E) -> bool,
        call: F,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(mut admission) = self.admit() else {
            return Err(BreakerError::Open);
        };

        let outcome = tokio::time::timeout(self.config.call_timeout, call()).await;

        let (failed, result) = match outcome {
            Err(_) => (true, Err(BreakerError::Timeout(self.config.call_timeout))),
            Ok(Ok(value)) => (false, Ok(value)),
            Ok(Err(e)) => (is_failure(&e), Err(BreakerError::Inner(e))),
        };

        admission.settled = true;
        self.record(admission.trial, failed);
        result
    }

    /// `None` means fail fast.
    fn admit(&self) -> Option<Admission<'_>> {
        let mut inner = self.lock();
        self.refresh(&mut inner, Instant::now());

        let trial = match inner.state {
            CircuitState::Closed => false,
            CircuitState::Open => return None,
            CircuitState::HalfOpen if inner.trial_in_flight => return None,
            CircuitState::HalfOpen => {
                inner.trial_in_flight = true;
                tracing::info!(breaker = %self.name, "Circuit half-open, admitting trial call");
                true
            }
        };

        Some(Admission {
            breaker: self,
            trial,
            settled: false,
        })
    }

    /// Apply the timed Open -> HalfOpen transition.
    fn refresh(&self, inner: &mut BreakerState, now: Instant) {
        if inner.state == CircuitState::Open {
            if let Some(opened_at) = inner.opened_at {
                if now.duration_since(opened_at) >= self.config.reset_timeout {
                    self.transition(inner, CircuitState::HalfOpen, now);
                }
            }
        }
    }

    fn record(&self, trial: bool, failed: bool) {
        let now = Instant::now();
        let mut inner = self.lock();

        if trial {
            inner.trial_in_flight = false;
            if failed {
                inner.opened_at = Some(now);
                self.transition(&mut inner, CircuitState::Open, now);
            } else {
                inner.outcomes.clear();
                self.transition(&mut inner, CircuitState::Closed, now);
            }
            return;
        }

        // Calls admitted before the circuit opened do not affect it afterwards.
        if inner.state != CircuitState::Closed {
            return;
        }

        inner.outcomes.push_back((now, failed));
        while let Some(&(at, _)) = inner.outcomes.front() {
            if now.duration_since(at) > self.config.rolling_window {
                inner.outcomes.pop_front();
            } else {
                break;
            }
        }

        let total = inner.outcomes.len();
        if failed && total >= self.config.volume_threshold {
            let failures = inner.outcomes.iter().filter(|(_, f)| *f).count();
            let percentage = failures as f64 * 100.0 / total as f64;
            if percentage > self.config.error_threshold_percentage {
                tracing::warn!(
                    breaker = %self.name,
                    failures = failures,
                    total = total,
                    error_percentage = percentage,
                    "Error threshold exceeded"
                );
                inner.outcomes.clear();
                inner.opened_at = Some(now);
                self.transition(&mut inner, CircuitState::Open, now);
            }
        }
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState, now: Instant) {
        if inner.state == to {
            return;
        }
        tracing::warn!(
            breaker = %self.name,
            from = %inner.state,
            to = %to,
            "Circuit breaker state change"
        );
        inner.state = to;
        inner.last_transition = now;
    }
}

impl<E> BreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open)
    }
}
