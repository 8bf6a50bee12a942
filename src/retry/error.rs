//! Error types for retry executions.

use std::fmt;
use std::time::Duration;

use super::history::ErrorHistory;

/// Why an execution ended without a success value.
///
/// # Examples
///
/// ```rust
/// use relentless::retry::{retry, Failure, RetryError, RetryPolicy};
/// use relentless::retry::stop::max_attempts;
///
/// let policy = RetryPolicy::new().with_stopper(max_attempts(2));
///
/// match retry(|| Err::<(), _>(Failure::Retry("always fails")), &policy) {
///     Err(RetryError::Exhausted(exhausted)) => {
///         assert_eq!(exhausted.attempts, 2);
///         assert_eq!(exhausted.errors.into_vec(), vec!["always fails"; 2]);
///     }
///     other => panic!("expected exhaustion, got {:?}", other),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The operation returned [`Failure::Stop`](super::Failure::Stop).
    Stopped(RetryStopped<E>),
    /// The stopper gave up after a retryable failure.
    Exhausted(RetryExhausted<E>),
}

/// The operation asked to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryStopped<E> {
    /// The error carried by the stop request.
    pub reason: E,
    /// Retained retryable errors seen before the stop, oldest first.
    pub previous: Vec<E>,
    /// Retryable errors evicted from `previous` by the policy's history limit.
    pub dropped: usize,
    /// Number of retryable failures before the stop.
    pub attempts: u32,
    /// Time from the first call until the stop.
    pub total_duration: Duration,
}

/// The stopper declared the execution over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    /// Retryable errors, oldest first.
    ///
    /// Holds the first error and the most recent ones up to
    /// [`RetryPolicy::history_limit`](super::RetryPolicy::history_limit). A busy-retrying
    /// policy bounded only by time can fail millions of times; the evicted errors are
    /// counted by [`ErrorHistory::dropped`].
    pub errors: ErrorHistory<E>,
    /// Number of failed attempts, equal to `errors.total()` unless it saturated.
    pub attempts: u32,
    /// Time from the first call until the stopper gave up.
    pub total_duration: Duration,
}

impl<E> RetryExhausted<E> {
    /// Create a new RetryExhausted error.
    pub fn new(errors: ErrorHistory<E>, attempts: u32, total_duration: Duration) -> Self {
        Self {
            errors,
            attempts,
            total_duration,
        }
    }

    /// The error from the final attempt.
    pub fn final_error(&self) -> &E {
        self.errors.last()
    }

    /// Extract the final error, discarding the history and metadata.
    pub fn into_error(self) -> E {
        self.errors.into_last()
    }
}

impl<E> RetryStopped<E> {
    /// Extract the stop reason.
    pub fn into_error(self) -> E {
        self.reason
    }
}

impl<E> RetryError<E> {
    /// Returns true if the operation requested the stop.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped(_))
    }

    /// Returns true if the stopper ended the execution.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    /// Number of retryable failures during the execution.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Stopped(s) => s.attempts,
            Self::Exhausted(e) => e.attempts,
        }
    }

    /// Time from the first call until the execution ended.
    pub fn total_duration(&self) -> Duration {
        match self {
            Self::Stopped(s) => s.total_duration,
            Self::Exhausted(e) => e.total_duration,
        }
    }

    /// The error that ended the execution: the stop reason or the last retryable error.
    pub fn error(&self) -> &E {
        match self {
            Self::Stopped(s) => &s.reason,
            Self::Exhausted(e) => e.final_error(),
        }
    }

    /// Extract the error that ended the execution.
    pub fn into_error(self) -> E {
        match self {
            Self::Stopped(s) => s.into_error(),
            Self::Exhausted(e) => e.into_error(),
        }
    }

    /// Every retained error, oldest first. A stop reason comes last.
    pub fn into_errors(self) -> Vec<E> {
        match self {
            Self::Stopped(s) => {
                let mut errors = s.previous;
                errors.push(s.reason);
                errors
            }
            Self::Exhausted(e) => e.errors.into_vec(),
        }
    }

    /// Transform every error, keeping the metadata.
    pub fn map_err<F, G>(self, mut f: G) -> RetryError<F>
    where
        G: FnMut(E) -> F,
    {
        match self {
            Self::Stopped(s) => RetryError::Stopped(RetryStopped {
                previous: s.previous.into_iter().map(&mut f).collect(),
                reason: f(s.reason),
                dropped: s.dropped,
                attempts: s.attempts,
                total_duration: s.total_duration,
            }),
            Self::Exhausted(e) => RetryError::Exhausted(RetryExhausted::new(
                e.errors.map(f),
                e.attempts,
                e.total_duration,
            )),
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryStopped<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "retry stopped after {} failed attempts ({:?}): {}",
            self.attempts, self.total_duration, self.reason
        )
    }
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "retry exhausted after {} attempts ({:?}): {}",
            self.attempts,
            self.total_duration,
            self.final_error()
        )
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped(s) => s.fmt(f),
            Self::Exhausted(e) => e.fmt(f),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryStopped<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryExhausted<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.final_error())
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error())
    }
}
