//! Retry Patterns Example
//!
//! Demonstrates composable delayers and stoppers.
//! Shows practical patterns including:
//! - Basic retry with exponential backoff
//! - How the built-in delay strategies grow
//! - Stopping early on permanent errors
//! - Retry with observability hooks
//! - Combining stoppers for a time budget
//! - Capped and jittered backoff
//! - An HTTP client pattern on tokio

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use relentless::prelude::*;

// ==================== Basic Retry ====================

/// Example 1: Basic retry with exponential backoff
///
/// Demonstrates retrying an operation that fails transiently.
fn example_basic_retry() {
    println!("\n=== Example 1: Basic Retry ===");

    let policy = RetryPolicy::new()
        .with_optional_delayer(exponential(Duration::from_millis(50)))
        .with_stopper(max_attempts(5));

    let mut attempts = 0;
    let result = retry(
        || {
            attempts += 1;
            println!("  Attempt {}", attempts);
            if attempts < 3 {
                Err(Failure::Retry("transient failure"))
            } else {
                Ok("success!")
            }
        },
        &policy,
    );

    match result {
        Ok(value) => println!("Success after {} attempts: {}", attempts, value),
        Err(e) => println!("Failed: {}", e),
    }
}

// ==================== Different Delay Strategies ====================

/// Example 2: Comparing delay strategies
///
/// Shows how delay grows with the number of failed attempts.
fn example_delay_strategies() {
    println!("\n=== Example 2: Delay Strategies ===");

    let start = Instant::now();
    let base = Duration::from_millis(100);

    let strategies: Vec<(&str, Option<SharedDelayer<()>>)> = vec![
        ("Fixed", Some(shared_delayer(fixed(base)))),
        ("Linear", Some(shared_delayer(linear(base)))),
        ("Exponential", exponential(base).map(shared_delayer)),
        (
            "Exponential, capped at 1s",
            limit(exponential(base), Duration::from_secs(1)).map(shared_delayer),
        ),
        (
            "Max of fixed 300ms and linear",
            max_of([
                Some(shared_delayer(fixed(Duration::from_millis(300)))),
                Some(shared_delayer(linear(base))),
            ])
            .map(shared_delayer),
        ),
    ];

    for (name, delayer) in strategies {
        println!("{} delays:", name);
        if let Some(delayer) = delayer {
            for attempt in 1..=5 {
                println!("  Attempt {}: {:?}", attempt, delayer.delay(start, attempt, &()));
            }
        }
    }
}

// ==================== Stopping Early ====================

/// Example 3: Permanent errors stop immediately
///
/// The operation classifies its own errors; a stop never consults the policy.
fn example_stop_early() {
    println!("\n=== Example 3: Stopping Early ===");

    #[derive(Debug, Clone, PartialEq)]
    enum AppError {
        Transient(String),
        Permanent(String),
    }

    fn classify(err: AppError) -> Failure<AppError> {
        match err {
            AppError::Transient(_) => Failure::Retry(err),
            AppError::Permanent(_) => Failure::Stop(err),
        }
    }

    let policy = RetryPolicy::new()
        .with_delayer(fixed(Duration::from_millis(100)))
        .with_stopper(max_attempts(5));

    let mut attempts = 0;
    let result: Result<(), _> = retry(
        || {
            attempts += 1;
            println!("  Attempting...");
            Err(classify(AppError::Permanent("invalid credentials".to_string())))
        },
        &policy,
    );
    println!("Permanent error (no retries): {:?}", result.unwrap_err().into_error());
    println!("Total attempts: {}", attempts);

    let mut attempts = 0;
    let result = retry(
        || {
            attempts += 1;
            println!("  Attempt {}", attempts);
            if attempts < 3 {
                Err(classify(AppError::Transient("connection timeout".to_string())))
            } else {
                Ok("connected!")
            }
        },
        &policy,
    );
    println!("\nTransient errors then success: {:?}", result);
    println!("Total attempts: {}", attempts);
}

// ==================== Retry with Observability ====================

/// Example 4: Retry with hooks for logging/metrics
fn example_retry_with_hooks() {
    println!("\n=== Example 4: Retry with Hooks ===");

    let policy = RetryPolicy::new()
        .with_delayer(linear(Duration::from_millis(20)))
        .with_stopper(max_attempts(4));

    let retries = AtomicU32::new(0);
    let result: Result<(), _> = retry_with_hooks(
        || Err(Failure::Retry("database unavailable")),
        &policy,
        |event: &RetryEvent<'_, &str>| {
            retries.fetch_add(1, Ordering::Relaxed);
            match event.next_delay {
                Some(delay) => println!(
                    "  [hook] attempt {} failed: {} (retrying in {:?}, {:?} elapsed)",
                    event.attempt, event.error, delay, event.elapsed
                ),
                None => println!(
                    "  [hook] attempt {} failed: {} (giving up)",
                    event.attempt, event.error
                ),
            }
        },
    );

    if let Err(RetryError::Exhausted(exhausted)) = result {
        println!(
            "Exhausted after {} attempts in {:?}",
            exhausted.attempts, exhausted.total_duration
        );
        for (i, err) in exhausted.errors.iter().enumerate() {
            println!("  error {}: {}", i + 1, err);
        }
    }
    println!("Hook saw {} failures", retries.load(Ordering::Relaxed));
}

// ==================== Time Budgets ====================

/// Example 5: Whichever comes first
///
/// Five attempts or 150ms, whichever is reached first.
fn example_time_budget() {
    println!("\n=== Example 5: Time Budget ===");

    let policy = RetryPolicy::new()
        .with_delayer(fixed(Duration::from_millis(60)))
        .with_stopper(Or(max_attempts(5), timeout(Duration::from_millis(150))));

    let result: Result<(), _> = retry(|| Err(Failure::Retry("slow dependency")), &policy);

    let err = result.unwrap_err();
    println!(
        "Gave up after {} attempts and {:?}: {}",
        err.attempts(),
        err.total_duration(),
        err.error()
    );

    // A deadline works the same way, on an absolute instant.
    let policy = RetryPolicy::new()
        .with_delayer(fixed(Duration::from_millis(10)))
        .with_stopper(deadline(Instant::now() + Duration::from_millis(50)));
    let result: Result<(), _> = retry(|| Err(Failure::Retry("still down")), &policy);
    println!("Deadline reached after {} attempts", result.unwrap_err().attempts());
}

// ==================== Jitter ====================

/// Example 6: Capped, jittered backoff
///
/// Adding a random component spreads out clients that failed together.
fn example_jitter() {
    println!("\n=== Example 6: Jittered Backoff ===");

    let delayer: Option<Limit<Combine<()>>> = limit(
        sum_of([
            exponential(Duration::from_millis(100)).map(shared_delayer),
            Some(shared_delayer(random(Duration::ZERO, Duration::from_millis(100)))),
        ]),
        Duration::from_secs(2),
    );

    let start = Instant::now();
    if let Some(delayer) = delayer {
        for attempt in 1..=6 {
            println!("  Attempt {}: {:?}", attempt, delayer.delay(start, attempt, &()));
        }
    }
}

// ==================== Async HTTP Pattern ====================

/// Example 7: HTTP client on tokio
///
/// Server errors and throttling retry; client errors stop.
async fn example_http_pattern() {
    println!("\n=== Example 7: HTTP Client Pattern ===");

    let policy = RetryPolicy::new()
        .with_optional_delayer(limit(
            exponential(Duration::from_millis(50)),
            Duration::from_millis(500),
        ))
        .with_stopper(max_attempts(5));

    // Simulate an API that fails twice with server errors then succeeds
    let attempts = Arc::new(AtomicU32::new(0));
    let result = retry_async(
        || {
            let attempts = attempts.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                println!("  HTTP request attempt {}", n + 1);
                match n {
                    0 => Err(Failure::from_http_status(503, "Service Unavailable")),
                    1 => Err(Failure::from_http_status(429, "Too Many Requests")),
                    _ => Ok("{ \"status\": \"ok\" }"),
                }
            }
        },
        &policy,
    )
    .await;

    match result {
        Ok(body) => println!("\nResponse: {}", body),
        Err(e) => println!("\nRequest failed: {}", e),
    }

    // Client errors are NOT retried
    println!("\n--- Client Error (should NOT retry) ---");
    let attempts = Arc::new(AtomicU32::new(0));
    let result: Result<&str, _> = retry_async(
        || {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                println!("  HTTP request attempt");
                Err(Failure::from_http_status(400, "Bad Request"))
            }
        },
        &policy,
    )
    .await;

    if let Err(e) = result {
        println!("\nRequest failed (no retries for client error): {}", e);
    }
    println!("Total attempts: {}", attempts.load(Ordering::SeqCst));
}

#[tokio::main]
async fn main() {
    // Shows the executor's own retry and exhaustion events next to the output below.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    println!("======================================");
    println!("       Retry Patterns Example         ");
    println!("======================================");

    example_basic_retry();
    example_delay_strategies();
    example_stop_early();
    example_retry_with_hooks();
    example_time_budget();
    example_jitter();
    example_http_pattern().await;

    println!("\n======================================");
    println!("           Examples Complete           ");
    println!("======================================");
}
