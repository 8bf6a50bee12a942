//! Async retry loop on tokio.
//!
//! Same state machine as [`retry`](super::retry), but the operation is a future
//! factory and the wait between attempts is a `tokio::time::sleep`, so the task
//! yields instead of blocking its worker thread.

use std::future::Future;
use std::ops::ControlFlow;

use super::error::RetryError;
use super::executor::{Execution, RetryEvent};
use super::outcome::Failure;
use super::policy::RetryPolicy;

/// Retry an async operation using a factory function.
///
/// Each attempt calls `make_future` for a fresh future: retry means "try this
/// operation again from scratch", with new connections or request IDs as needed.
///
/// # Example
///
/// ```rust
/// use relentless::retry::{retry_async, Failure, RetryPolicy};
/// use relentless::retry::delay::fixed;
/// use relentless::retry::stop::max_attempts;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let policy = RetryPolicy::new()
///     .with_delayer(fixed(Duration::from_millis(1)))
///     .with_stopper(max_attempts(5));
///
/// let calls = AtomicU32::new(0);
/// let result = retry_async(
///     || async {
///         if calls.fetch_add(1, Ordering::SeqCst) < 2 {
///             Err(Failure::Retry("transient failure"))
///         } else {
///             Ok(42)
///         }
///     },
///     &policy,
/// )
/// .await;
///
/// assert_eq!(result, Ok(42));
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// # });
/// ```
pub async fn retry_async<T, E, F, Fut>(
    make_future: F,
    policy: &RetryPolicy<E>,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Failure<E>>>,
{
    retry_async_with_hooks(make_future, policy, |_: &RetryEvent<'_, E>| {}).await
}

/// Like [`retry_async`], with `on_retry` invoked after every retryable failure.
///
/// The hook is synchronous and should not block.
pub async fn retry_async_with_hooks<T, E, F, Fut, H>(
    mut make_future: F,
    policy: &RetryPolicy<E>,
    mut on_retry: H,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Failure<E>>>,
    H: FnMut(&RetryEvent<'_, E>),
{
    let mut execution = Execution::start();

    loop {
        let failure = match make_future().await {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        match execution.on_failure(failure, policy, &mut on_retry) {
            ControlFlow::Break(error) => return Err(error),
            ControlFlow::Continue(delay) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
