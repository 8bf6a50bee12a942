//! Integration tests for the retry executor through the public API.
//!
//! These tests drive realistic operations (a flaky service, an HTTP-like client) and
//! check the observable contract: how often the operation runs, what the policy is
//! asked, and what the caller gets back.

use relentless::prelude::*;
use relentless::{RetryExhausted, RetryStopped};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ============================================================================
// Test fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum ServiceError {
    Unavailable(u32),
    BadRequest,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Unavailable(n) => write!(f, "service unavailable (call {})", n),
            ServiceError::BadRequest => write!(f, "bad request"),
        }
    }
}

impl std::error::Error for ServiceError {}

/// A service that fails a fixed number of times before answering.
struct FlakyService {
    failures_left: AtomicU32,
    calls: AtomicU32,
}

impl FlakyService {
    fn new(failures: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }

    fn call(&self) -> Result<&'static str, Failure<ServiceError>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            Err(Failure::Retry(ServiceError::Unavailable(n)))
        } else {
            Ok("ok")
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Builds a delayer and a stopper that count their invocations.
fn counted(
    delay: Duration,
    max: u32,
) -> (
    impl Delayer<ServiceError> + 'static,
    impl Stopper<ServiceError> + 'static,
    Arc<AtomicU32>,
    Arc<AtomicU32>,
) {
    let delayer_calls = Arc::new(AtomicU32::new(0));
    let stopper_calls = Arc::new(AtomicU32::new(0));

    let delayer = {
        let calls = delayer_calls.clone();
        move |_: Instant, _: u32, _: &ServiceError| {
            calls.fetch_add(1, Ordering::SeqCst);
            delay
        }
    };
    let stopper = {
        let calls = stopper_calls.clone();
        move |_: Instant, attempts: u32, _: &ServiceError| {
            calls.fetch_add(1, Ordering::SeqCst);
            attempts >= max
        }
    };

    (delayer, stopper, delayer_calls, stopper_calls)
}

// ============================================================================
// Executor contract
// ============================================================================

#[test]
fn round_trip_retries_exactly_k_times() {
    for k in [0, 1, 3, 7] {
        let service = FlakyService::new(k);
        let (delayer, stopper, delayer_calls, stopper_calls) = counted(Duration::ZERO, k + 2);
        let policy = RetryPolicy::new()
            .with_delayer(delayer)
            .with_stopper(stopper);

        let result = retry(|| service.call(), &policy);

        assert_eq!(result, Ok("ok"));
        assert_eq!(service.calls(), k + 1);
        assert_eq!(delayer_calls.load(Ordering::SeqCst), k);
        assert_eq!(stopper_calls.load(Ordering::SeqCst), k);
    }
}

#[test]
fn sentinel_stop_skips_policy() {
    let (delayer, stopper, delayer_calls, stopper_calls) = counted(Duration::from_secs(60), 5);
    let policy = RetryPolicy::new()
        .with_delayer(delayer)
        .with_stopper(stopper);

    let started = Instant::now();
    let result: Result<(), _> = retry(|| Err(Failure::Stop(ServiceError::BadRequest)), &policy);

    match result {
        Err(RetryError::Stopped(RetryStopped {
            reason,
            previous,
            attempts,
            ..
        })) => {
            assert_eq!(reason, ServiceError::BadRequest);
            assert!(previous.is_empty());
            assert_eq!(attempts, 0);
        }
        other => panic!("expected sentinel stop, got {:?}", other),
    }
    assert_eq!(delayer_calls.load(Ordering::SeqCst), 0);
    assert_eq!(stopper_calls.load(Ordering::SeqCst), 0);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn exhaustion_after_three_attempts() {
    let service = FlakyService::new(u32::MAX);
    let (delayer, _, delayer_calls, _) = counted(Duration::from_millis(1), 0);
    let stopper_calls = Arc::new(AtomicU32::new(0));
    let stopper = {
        let calls = stopper_calls.clone();
        move |start: Instant, attempts: u32, err: &ServiceError| {
            calls.fetch_add(1, Ordering::SeqCst);
            max_attempts(3).stop(start, attempts, err)
        }
    };
    let policy = RetryPolicy::new()
        .with_delayer(delayer)
        .with_stopper(stopper);

    let result = retry(|| service.call(), &policy);

    let err = result.unwrap_err();
    assert!(err.is_exhausted());
    assert_eq!(err.attempts(), 3);
    assert_eq!(err.error(), &ServiceError::Unavailable(3));
    assert_eq!(
        err.into_errors(),
        vec![
            ServiceError::Unavailable(1),
            ServiceError::Unavailable(2),
            ServiceError::Unavailable(3),
        ]
    );
    assert_eq!(service.calls(), 3);
    assert_eq!(stopper_calls.load(Ordering::SeqCst), 3);
    // The final failure is not followed by a delay.
    assert_eq!(delayer_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn fixed_delay_then_success() {
    let service = FlakyService::new(2);
    let policy = RetryPolicy::new()
        .with_delayer(fixed(Duration::from_millis(100)))
        .with_stopper(max_attempts(3));

    let started = Instant::now();
    let result = retry(|| service.call(), &policy);

    assert_eq!(result, Ok("ok"));
    assert_eq!(service.calls(), 3);
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[test]
fn exponential_delays_double_per_attempt() {
    let backoff = exponential(Duration::from_millis(10)).unwrap();
    let start = Instant::now();

    let delays: Vec<_> = (1..=5)
        .map(|attempt| {
            Delayer::<ServiceError>::delay(&backoff, start, attempt, &ServiceError::BadRequest)
        })
        .collect();

    assert_eq!(delays, [20, 40, 80, 160, 320].map(Duration::from_millis).to_vec());
}

#[test]
fn timeout_bounds_a_fast_failing_operation() {
    let service = FlakyService::new(u32::MAX);
    let policy = RetryPolicy::new()
        .with_delayer(fixed(Duration::from_millis(1)))
        .with_stopper(Or(max_attempts(1_000_000), timeout(Duration::from_millis(50))));

    let started = Instant::now();
    let result = retry(|| service.call(), &policy);
    let elapsed = started.elapsed();

    assert!(result.unwrap_err().is_exhausted());
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_secs(5));
    assert!(service.calls() < 1_000_000);
}

#[test]
fn deadline_in_the_past_stops_after_first_failure() {
    let service = FlakyService::new(u32::MAX);
    let policy = RetryPolicy::new().with_stopper(deadline(Instant::now()));
    std::thread::sleep(Duration::from_millis(2));

    let result = retry(|| service.call(), &policy);

    assert_eq!(result.unwrap_err().attempts(), 1);
    assert_eq!(service.calls(), 1);
}

#[test]
fn error_aware_stopper_gives_up_on_specific_errors() {
    let mut calls = 0;
    let policy = RetryPolicy::new().with_stopper(
        |_: Instant, attempts: u32, err: &ServiceError| {
            *err == ServiceError::BadRequest || attempts >= 10
        },
    );

    let result: Result<(), _> = retry(
        || {
            calls += 1;
            if calls < 3 {
                Err(Failure::Retry(ServiceError::Unavailable(calls)))
            } else {
                Err(Failure::Retry(ServiceError::BadRequest))
            }
        },
        &policy,
    );

    match result {
        Err(RetryError::Exhausted(RetryExhausted { errors, attempts, .. })) => {
            assert_eq!(attempts, 3);
            assert_eq!(errors.len(), 3);
            assert_eq!(errors.last(), &ServiceError::BadRequest);
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
}

// ============================================================================
// Collaborator patterns
// ============================================================================

#[test]
fn http_status_classification_drives_retries() {
    let statuses = Mutex::new(vec![503, 429, 200].into_iter());
    let policy = RetryPolicy::new()
        .with_delayer(fixed(Duration::from_millis(1)))
        .with_stopper(max_attempts(5));

    let result = retry(
        || match statuses.lock().unwrap().next() {
            Some(200) => Ok("body"),
            Some(status) => Err(Failure::from_http_status(status, format!("HTTP {}", status))),
            None => Err(Failure::Stop("no more responses".to_string())),
        },
        &policy,
    );

    assert_eq!(result, Ok("body"));

    let result: Result<(), _> = retry(
        || Err(Failure::from_http_status(404, "HTTP 404".to_string())),
        &policy,
    );
    let err = result.unwrap_err();
    assert!(err.is_stopped());
    let message = err.to_string();
    assert!(message.starts_with("retry stopped after 0 failed attempts"));
    assert!(message.ends_with(": HTTP 404"));
}

#[test]
fn combined_delays_are_capped() {
    let policy = RetryPolicy::new()
        .with_optional_delayer(limit(
            sum_of([
                Some(shared_delayer(fixed(Duration::from_millis(1)))),
                Some(shared_delayer(linear(Duration::from_millis(1)))),
            ]),
            Duration::from_millis(3),
        ))
        .with_stopper(max_attempts(6));

    let mut delays = Vec::new();
    let result: Result<(), _> = retry_with_hooks(
        || Err(Failure::Retry(ServiceError::Unavailable(0))),
        &policy,
        |event: &RetryEvent<'_, ServiceError>| delays.push(event.next_delay),
    );

    assert!(result.is_err());
    assert_eq!(
        delays,
        vec![
            Some(Duration::from_millis(2)),
            Some(Duration::from_millis(3)),
            Some(Duration::from_millis(3)),
            Some(Duration::from_millis(3)),
            Some(Duration::from_millis(3)),
            None,
        ]
    );
}

#[test]
fn one_policy_serves_many_threads() {
    let policy = RetryPolicy::new()
        .with_delayer(fixed(Duration::from_millis(1)))
        .with_stopper(max_attempts(5));
    let handles: Vec<_> = (0..8u32)
        .map(|i: u32| {
            let policy = policy.clone();
            std::thread::spawn(move || {
                let mut calls = 0;
                retry(
                    || {
                        calls += 1;
                        if calls <= i % 3 {
                            Err(Failure::Retry(ServiceError::Unavailable(calls)))
                        } else {
                            Ok(calls)
                        }
                    },
                    &policy,
                )
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Ok(i as u32 % 3 + 1));
    }
}

#[test]
fn retry_error_exposes_source() {
    use std::error::Error;

    let policy = RetryPolicy::new().with_stopper(max_attempts(1));
    let result: Result<(), _> = retry(|| Err(Failure::Retry(ServiceError::BadRequest)), &policy);

    let err = result.unwrap_err();
    let source = err.source().expect("exhaustion carries a source");
    assert_eq!(source.to_string(), "bad request");
}
