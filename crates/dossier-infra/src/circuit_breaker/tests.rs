use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dossier_core::StorageBackend;

use super::*;

#[derive(Debug, PartialEq)]
enum FakeError {
    Unreachable,
    Missing,
}

fn config() -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        volume_threshold: 10,
        error_threshold_percentage: 50.0,
        rolling_window: Duration::from_secs(60),
        reset_timeout: Duration::from_secs(30),
        call_timeout: Duration::from_secs(5),
    }
}

fn is_failure(e: &FakeError) -> bool {
    *e == FakeError::Unreachable
}

async fn fail(breaker: &CircuitBreaker, calls: &AtomicUsize) -> Result<(), BreakerError<FakeError>> {
    breaker
        .call(is_failure, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(FakeError::Unreachable)
        })
        .await
}

async fn succeed(breaker: &CircuitBreaker, calls: &AtomicUsize) -> Result<(), BreakerError<FakeError>> {
    breaker
        .call(is_failure, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<(), FakeError>(())
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn opens_after_threshold_and_fails_fast() {
    let breaker = CircuitBreaker::new("s3:upload", config());
    let calls = AtomicUsize::new(0);

    for _ in 0..10 {
        assert!(matches!(
            fail(&breaker, &calls).await,
            Err(BreakerError::Inner(FakeError::Unreachable))
        ));
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    let result = fail(&breaker, &calls).await;
    assert!(result.as_ref().is_err_and(|e| e.is_open()));
    assert_eq!(calls.load(Ordering::SeqCst), 10);
}

#[tokio::test(start_paused = true)]
async fn half_open_admits_one_trial_after_reset_timeout() {
    let breaker = CircuitBreaker::new("s3:upload", config());
    let calls = AtomicUsize::new(0);
    for _ in 0..10 {
        let _ = fail(&breaker, &calls).await;
    }

    tokio::time::advance(Duration::from_secs(29)).await;
    assert!(fail(&breaker, &calls).await.unwrap_err().is_open());

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    assert!(succeed(&breaker, &calls).await.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 11);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn failed_trial_reopens() {
    let breaker = CircuitBreaker::new("nas:delete", config());
    let calls = AtomicUsize::new(0);
    for _ in 0..10 {
        let _ = fail(&breaker, &calls).await;
    }
    tokio::time::advance(Duration::from_secs(30)).await;

    assert!(matches!(
        fail(&breaker, &calls).await,
        Err(BreakerError::Inner(_))
    ));
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(fail(&breaker, &calls).await.unwrap_err().is_open());
    assert_eq!(calls.load(Ordering::SeqCst), 11);
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_fail_fast_during_trial() {
    let breaker = Arc::new(CircuitBreaker::new("gcs:download", config()));
    let calls = AtomicUsize::new(0);
    for _ in 0..10 {
        let _ = fail(&breaker, &calls).await;
    }
    tokio::time::advance(Duration::from_secs(30)).await;

    let trial_breaker = breaker.clone();
    let trial = tokio::spawn(async move {
        trial_breaker
            .call(is_failure, || async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<(), FakeError>(())
            })
            .await
    });
    tokio::task::yield_now().await;

    assert!(succeed(&breaker, &calls).await.unwrap_err().is_open());

    assert!(trial.await.unwrap().is_ok());
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn dropped_trial_frees_the_slot() {
    let breaker = CircuitBreaker::new("azure:upload", config());
    let calls = AtomicUsize::new(0);
    for _ in 0..10 {
        let _ = fail(&breaker, &calls).await;
    }
    tokio::time::advance(Duration::from_secs(30)).await;

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        breaker.call(is_failure, || async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok::<(), FakeError>(())
        }),
    )
    .await;
    assert!(abandoned.is_err());

    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    assert!(succeed(&breaker, &calls).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn definite_answers_do_not_trip() {
    let breaker = CircuitBreaker::new("s3:download", config());
    for _ in 0..20 {
        let result = breaker
            .call(is_failure, || async { Err::<(), _>(FakeError::Missing) })
            .await;
        assert!(matches!(result, Err(BreakerError::Inner(FakeError::Missing))));
    }
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn below_volume_threshold_stays_closed() {
    let breaker = CircuitBreaker::new("s3:exists", config());
    let calls = AtomicUsize::new(0);
    for _ in 0..9 {
        let _ = fail(&breaker, &calls).await;
    }
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn old_outcomes_leave_the_window() {
    let breaker = CircuitBreaker::new("s3:upload", config());
    let calls = AtomicUsize::new(0);
    for _ in 0..9 {
        let _ = fail(&breaker, &calls).await;
    }
    tokio::time::advance(Duration::from_secs(61)).await;
    let _ = fail(&breaker, &calls).await;
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn timeouts_count_as_failures() {
    let mut cfg = config();
    cfg.volume_threshold = 1;
    let breaker = CircuitBreaker::new("nas:upload", cfg);

    let result = breaker
        .call(is_failure, || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<(), FakeError>(())
        })
        .await;

    assert!(matches!(result, Err(BreakerError::Timeout(_))));
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[test]
fn registry_covers_external_backends_only() {
    let registry = CircuitBreakerRegistry::new(config());
    assert!(registry
        .get(StorageBackend::Local, StorageOperation::Upload)
        .is_none());

    let breaker = registry
        .get(StorageBackend::S3, StorageOperation::Upload)
        .unwrap();
    assert_eq!(breaker.name(), "s3:upload");
    assert_eq!(registry.states().len(), 16);
}
