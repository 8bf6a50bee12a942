//! The delayer/stopper pair consulted by the executor.

use std::fmt;
use std::time::{Duration, Instant};

use super::delay::{Delayer, SharedDelayer};
use super::stop::{SharedStopper, Stopper};

/// Errors retained per execution unless [`RetryPolicy::with_history_limit`] says otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

/// A retry policy: an optional [`Delayer`] and an optional [`Stopper`].
///
/// Policies only describe retry behavior; [`retry`](super::retry) executes it. Both
/// halves are shared handles, so cloning a policy is cheap and one policy can drive any
/// number of concurrent executions.
///
/// # Bounds Behavior
///
/// Without a stopper the executor retries until the operation succeeds or asks to
/// stop. Without a delayer it retries immediately. Production callers should always
/// configure a stopper; [`RetryPolicy::is_bounded`] reports whether one is set.
///
/// A time-based stopper with no delayer busy-retries, so the number of failures depends
/// on how fast the operation fails rather than on any attempt count. Retained errors are
/// therefore capped at [`DEFAULT_HISTORY_LIMIT`] (see [`RetryPolicy::with_history_limit`]);
/// the attempt counter still counts every failure.
///
/// # Examples
///
/// ```rust
/// use relentless::retry::RetryPolicy;
/// use relentless::retry::delay::{exponential, Limit};
/// use relentless::retry::stop::{max_attempts, timeout, Or};
/// use std::time::Duration;
///
/// let policy: RetryPolicy<std::io::Error> = RetryPolicy::new()
///     .with_optional_delayer(
///         exponential(Duration::from_millis(100)).map(|d| Limit::new(d, Duration::from_secs(5))),
///     )
///     .with_stopper(Or(max_attempts(5), timeout(Duration::from_secs(30))));
///
/// assert!(policy.is_bounded());
/// assert!(policy.delayer().is_some());
/// ```
pub struct RetryPolicy<E: ?Sized> {
    delayer: Option<SharedDelayer<E>>,
    stopper: Option<SharedStopper<E>>,
    history_limit: usize,
}

impl<E: ?Sized> RetryPolicy<E> {
    /// A policy with neither delayer nor stopper.
    pub fn new() -> Self {
        Self {
            delayer: None,
            stopper: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Set the delayer.
    pub fn with_delayer<D>(mut self, delayer: D) -> Self
    where
        D: Delayer<E> + 'static,
    {
        self.delayer = Some(SharedDelayer::new(delayer));
        self
    }

    /// Set the delayer if present, clear it otherwise.
    ///
    /// Accepts the `Option` returned by constructors such as
    /// [`exponential`](super::delay::exponential) directly.
    pub fn with_optional_delayer<D>(mut self, delayer: Option<D>) -> Self
    where
        D: Delayer<E> + 'static,
    {
        self.delayer = delayer.map(SharedDelayer::new);
        self
    }

    /// Set an already shared delayer.
    pub fn with_shared_delayer(mut self, delayer: SharedDelayer<E>) -> Self {
        self.delayer = Some(delayer);
        self
    }

    /// Set the stopper.
    pub fn with_stopper<S>(mut self, stopper: S) -> Self
    where
        S: Stopper<E> + 'static,
    {
        self.stopper = Some(SharedStopper::new(stopper));
        self
    }

    /// Set the stopper if present, clear it otherwise.
    pub fn with_optional_stopper<S>(mut self, stopper: Option<S>) -> Self
    where
        S: Stopper<E> + 'static,
    {
        self.stopper = stopper.map(SharedStopper::new);
        self
    }

    /// Set an already shared stopper.
    pub fn with_shared_stopper(mut self, stopper: SharedStopper<E>) -> Self {
        self.stopper = Some(stopper);
        self
    }

    /// Retain at most `limit` errors per execution (at least 1).
    ///
    /// The first error and the most recent ones are kept; see [`ErrorHistory`].
    ///
    /// ```rust
    /// use relentless::retry::{retry, Failure, RetryPolicy};
    /// use relentless::retry::stop::max_attempts;
    ///
    /// let policy = RetryPolicy::new()
    ///     .with_stopper(max_attempts(10))
    ///     .with_history_limit(3);
    ///
    /// let mut calls = 0;
    /// let result: Result<(), _> = retry(
    ///     || {
    ///         calls += 1;
    ///         Err(Failure::Retry(calls))
    ///     },
    ///     &policy,
    /// );
    ///
    /// let err = result.unwrap_err();
    /// assert_eq!(err.attempts(), 10);
    /// assert_eq!(err.into_errors(), vec![1, 9, 10]);
    /// ```
    ///
    /// [`ErrorHistory`]: super::ErrorHistory
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Maximum number of errors retained per execution.
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Get the delayer.
    pub fn delayer(&self) -> Option<&SharedDelayer<E>> {
        self.delayer.as_ref()
    }

    /// Get the stopper.
    pub fn stopper(&self) -> Option<&SharedStopper<E>> {
        self.stopper.as_ref()
    }

    /// Returns true when a stopper bounds the execution.
    pub fn is_bounded(&self) -> bool {
        self.stopper.is_some()
    }

    /// Decide what follows a retryable failure.
    ///
    /// Returns `None` when the stopper gives up, otherwise the delay before the next
    /// attempt. The delayer is not consulted when the stopper fires.
    ///
    /// ```rust
    /// use relentless::retry::RetryPolicy;
    /// use relentless::retry::delay::fixed;
    /// use relentless::retry::stop::max_attempts;
    /// use std::time::{Duration, Instant};
    ///
    /// let policy = RetryPolicy::<()>::new()
    ///     .with_delayer(fixed(Duration::from_millis(5)))
    ///     .with_stopper(max_attempts(2));
    ///
    /// let start = Instant::now();
    /// assert_eq!(policy.next_delay(start, 1, &()), Some(Duration::from_millis(5)));
    /// assert_eq!(policy.next_delay(start, 2, &()), None);
    /// ```
    pub fn next_delay(&self, start: Instant, attempts: u32, error: &E) -> Option<Duration> {
        if let Some(stopper) = &self.stopper {
            if stopper.stop(start, attempts, error) {
                return None;
            }
        }

        Some(
            self.delayer
                .as_ref()
                .map_or(Duration::ZERO, |d| d.delay(start, attempts, error)),
        )
    }
}

impl<E: ?Sized> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            delayer: self.delayer.clone(),
            stopper: self.stopper.clone(),
            history_limit: self.history_limit,
        }
    }
}

impl<E: ?Sized> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("delayer", &self.delayer.is_some())
            .field("stopper", &self.stopper.is_some())
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;
    use crate::retry::delay::{exponential, fixed, linear};
    use crate::retry::stop::max_attempts;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_empty_policy_never_stops() {
        let policy = RetryPolicy::<()>::new();
        assert!(!policy.is_bounded());
        assert_eq!(policy.next_delay(Instant::now(), u32::MAX, &()), Some(Duration::ZERO));
    }

    #[test]
    fn test_stopper_wins_over_delayer() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = {
            let calls = calls.clone();
            move |_: Instant, _: u32, _: &()| {
                calls.fetch_add(1, Ordering::SeqCst);
                ms(1)
            }
        };
        let policy = RetryPolicy::new()
            .with_delayer(counted)
            .with_stopper(max_attempts(1));

        assert_eq!(policy.next_delay(Instant::now(), 1, &()), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_delay_follows_strategy() {
        let policy = RetryPolicy::<()>::new()
            .with_delayer(linear(ms(10)))
            .with_stopper(max_attempts(5));

        assert_eq!(policy.next_delay(Instant::now(), 1, &()), Some(ms(10)));
        assert_eq!(policy.next_delay(Instant::now(), 4, &()), Some(ms(40)));
        assert_eq!(policy.next_delay(Instant::now(), 5, &()), None);
    }

    #[test]
    fn test_optional_delayer_clears_on_none() {
        let policy = RetryPolicy::<()>::new()
            .with_delayer(fixed(ms(10)))
            .with_optional_delayer(exponential(Duration::ZERO));
        assert!(policy.delayer().is_none());
    }

    #[test]
    fn test_policy_is_clone_and_shares_strategies() {
        let policy = RetryPolicy::<()>::new().with_stopper(max_attempts(3));
        let cloned = policy.clone();
        assert!(SharedStopper::ptr_eq(
            policy.stopper().unwrap(),
            cloned.stopper().unwrap()
        ));
    }

    #[test]
    fn test_policy_is_debug() {
        let policy = RetryPolicy::<()>::new().with_delayer(fixed(ms(1)));
        let debug = format!("{:?}", policy);
        assert!(debug.contains("RetryPolicy"));
        assert!(debug.contains("delayer: true"));
        assert!(debug.contains("stopper: false"));
    }

    #[test]
    fn test_history_limit_defaults_and_clamps() {
        let policy = RetryPolicy::<()>::new();
        assert_eq!(policy.history_limit(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(policy.clone().with_history_limit(0).history_limit(), 1);
        assert_eq!(policy.with_history_limit(8).clone().history_limit(), 8);
    }

    #[test]
    fn test_policy_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RetryPolicy<std::io::Error>>();
    }
}
