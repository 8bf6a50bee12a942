//! The blocking retry loop.

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use super::error::{RetryError, RetryExhausted, RetryStopped};
use super::history::ErrorHistory;
use super::outcome::Failure;
use super::policy::RetryPolicy;

/// Information about a retryable failure, passed to hooks.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a, E> {
    /// How many attempts have failed so far (1-indexed).
    pub attempt: u32,
    /// The error from the failed attempt.
    pub error: &'a E,
    /// Delay before the next attempt, or `None` when the stopper gave up.
    pub next_delay: Option<Duration>,
    /// Total elapsed time since the first attempt.
    pub elapsed: Duration,
}

/// State of one execution, shared by the blocking and async loops.
pub(crate) struct Execution<E> {
    start: Instant,
    attempts: u32,
    history: Option<ErrorHistory<E>>,
}

impl<E> Execution<E> {
    pub(crate) fn start() -> Self {
        Self {
            start: Instant::now(),
            attempts: 0,
            history: None,
        }
    }

    /// Classify a failure. `Continue` carries the delay before the next attempt,
    /// `Break` the terminal error.
    pub(crate) fn on_failure<H>(
        &mut self,
        failure: Failure<E>,
        policy: &RetryPolicy<E>,
        on_retry: &mut H,
    ) -> ControlFlow<RetryError<E>, Duration>
    where
        H: FnMut(&RetryEvent<'_, E>),
    {
        let error = match failure {
            Failure::Stop(reason) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempts = self.attempts, "operation requested stop");

                let (previous, dropped) = match self.history.take() {
                    Some(history) => {
                        let dropped = history.dropped();
                        (history.into_vec(), dropped)
                    }
                    None => (Vec::new(), 0),
                };
                return ControlFlow::Break(RetryError::Stopped(RetryStopped {
                    reason,
                    previous,
                    dropped,
                    attempts: self.attempts,
                    total_duration: self.start.elapsed(),
                }));
            }
            Failure::Retry(error) => error,
        };

        self.attempts = self.attempts.saturating_add(1);
        let next_delay = policy.next_delay(self.start, self.attempts, &error);

        on_retry(&RetryEvent {
            attempt: self.attempts,
            error: &error,
            next_delay,
            elapsed: self.start.elapsed(),
        });

        match next_delay {
            Some(delay) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    attempt = self.attempts,
                    delay_ms = log_millis(delay),
                    "attempt failed, retrying"
                );

                self.record(error, policy.history_limit());
                ControlFlow::Continue(delay)
            }
            None => {
                let total_duration = self.start.elapsed();

                #[cfg(feature = "tracing")]
                tracing::warn!(
                    attempts = self.attempts,
                    elapsed_ms = log_millis(total_duration),
                    "retry exhausted"
                );

                let errors = match self.history.take() {
                    Some(mut history) => {
                        history.push_bounded(error, policy.history_limit());
                        history
                    }
                    None => ErrorHistory::new(error),
                };
                ControlFlow::Break(RetryError::Exhausted(RetryExhausted::new(
                    errors,
                    self.attempts,
                    total_duration,
                )))
            }
        }
    }

    fn record(&mut self, error: E, limit: usize) {
        match &mut self.history {
            Some(history) => history.push_bounded(error, limit),
            None => self.history = Some(ErrorHistory::new(error)),
        }
    }
}

/// Whole milliseconds for log fields, saturating at `u64::MAX`.
#[cfg(feature = "tracing")]
pub(crate) fn log_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Run `operation` until it succeeds, asks to stop, or the policy gives up.
///
/// The calling thread sleeps between attempts. On exhaustion the retryable errors are
/// returned in order, bounded by [`RetryPolicy::history_limit`]; see
/// [`RetryExhausted::errors`].
///
/// # Example
///
/// ```rust
/// use relentless::retry::{retry, Failure, RetryPolicy};
/// use relentless::retry::delay::fixed;
/// use relentless::retry::stop::max_attempts;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new()
///     .with_delayer(fixed(Duration::from_millis(1)))
///     .with_stopper(max_attempts(5));
///
/// let mut calls = 0;
/// let result = retry(
///     || {
///         calls += 1;
///         if calls < 3 {
///             Err(Failure::Retry("transient failure"))
///         } else {
///             Ok("success")
///         }
///     },
///     &policy,
/// );
///
/// assert_eq!(result, Ok("success"));
/// assert_eq!(calls, 3);
/// ```
pub fn retry<T, E, F>(operation: F, policy: &RetryPolicy<E>) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, Failure<E>>,
{
    retry_with_hooks(operation, policy, |_: &RetryEvent<'_, E>| {})
}

/// Like [`retry`], with `on_retry` invoked after every retryable failure.
///
/// The hook runs before the sleep and also for the failure that exhausts the policy,
/// in which case [`RetryEvent::next_delay`] is `None`. Use it for logging or metrics;
/// it should not block.
///
/// # Example
///
/// ```rust
/// use relentless::retry::{retry_with_hooks, Failure, RetryEvent, RetryPolicy};
/// use relentless::retry::stop::max_attempts;
///
/// let policy = RetryPolicy::new().with_stopper(max_attempts(3));
/// let mut seen = Vec::new();
///
/// let result = retry_with_hooks(
///     || Err::<(), _>(Failure::Retry("down")),
///     &policy,
///     |event: &RetryEvent<'_, &str>| seen.push((event.attempt, event.next_delay.is_some())),
/// );
///
/// assert!(result.is_err());
/// assert_eq!(seen, vec![(1, true), (2, true), (3, false)]);
/// ```
pub fn retry_with_hooks<T, E, F, H>(
    mut operation: F,
    policy: &RetryPolicy<E>,
    mut on_retry: H,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, Failure<E>>,
    H: FnMut(&RetryEvent<'_, E>),
{
    let mut execution = Execution::start();

    loop {
        let failure = match operation() {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        match execution.on_failure(failure, policy, &mut on_retry) {
            ControlFlow::Break(error) => return Err(error),
            ControlFlow::Continue(delay) => {
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
        }
    }
}

impl<E> RetryPolicy<E> {
    /// Run `operation` under this policy. See [`retry`].
    pub fn retry<T, F>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, Failure<E>>,
    {
        retry(operation, self)
    }
}
