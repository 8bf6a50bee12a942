//! Stop strategies and combinators.
//!
//! A [`Stopper`] decides, after each retryable failure, whether the executor should give
//! up. Like delayers, stoppers are pure functions of the execution start, the number of
//! failed attempts and the latest error.
//!
//! ```rust
//! use relentless::retry::stop::*;
//! use std::time::{Duration, Instant};
//!
//! let stopper = Or(max_attempts(5), timeout(Duration::from_secs(30)));
//!
//! let start = Instant::now();
//! assert!(!Stopper::<()>::stop(&stopper, start, 4, &()));
//! assert!(Stopper::<()>::stop(&stopper, start, 5, &()));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Decides whether to abandon retries.
///
/// Implemented for every `Fn(Instant, u32, &E) -> bool` closure.
pub trait Stopper<E: ?Sized>: Send + Sync {
    /// Returns true when no further attempt should be made.
    fn stop(&self, start: Instant, attempts: u32, error: &E) -> bool;
}

impl<E: ?Sized, F> Stopper<E> for F
where
    F: Fn(Instant, u32, &E) -> bool + Send + Sync,
{
    #[inline]
    fn stop(&self, start: Instant, attempts: u32, error: &E) -> bool {
        self(start, attempts, error)
    }
}

/// A type-erased stopper that can be cloned and shared across threads.
pub struct SharedStopper<E: ?Sized>(Arc<dyn Stopper<E>>);

impl<E: ?Sized> SharedStopper<E> {
    /// Erase the type of `stopper`.
    pub fn new<S>(stopper: S) -> Self
    where
        S: Stopper<E> + 'static,
    {
        Self(Arc::new(stopper))
    }

    /// Returns true if both handles point at the same strategy.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl<E: ?Sized> Stopper<E> for SharedStopper<E> {
    #[inline]
    fn stop(&self, start: Instant, attempts: u32, error: &E) -> bool {
        self.0.stop(start, attempts, error)
    }
}

impl<E: ?Sized> Clone for SharedStopper<E> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<E: ?Sized> fmt::Debug for SharedStopper<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedStopper(..)")
    }
}

/// Erase a stopper's type for [`any_of`], [`all_of`] or a
/// [`RetryPolicy`](crate::retry::RetryPolicy).
pub fn shared_stopper<E, S>(stopper: S) -> SharedStopper<E>
where
    E: ?Sized,
    S: Stopper<E> + 'static,
{
    SharedStopper::new(stopper)
}

/// Stops once `attempts >= n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaxAttempts(pub u32);

impl<E: ?Sized> Stopper<E> for MaxAttempts {
    #[inline]
    fn stop(&self, _start: Instant, attempts: u32, _error: &E) -> bool {
        attempts >= self.0
    }
}

/// Create a [`MaxAttempts`] stopper.
pub fn max_attempts(n: u32) -> MaxAttempts {
    MaxAttempts(n)
}

/// Stops once more than the given duration has passed since the execution started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeout(pub Duration);

impl<E: ?Sized> Stopper<E> for Timeout {
    fn stop(&self, start: Instant, _attempts: u32, _error: &E) -> bool {
        // An end instant past the clock's range is never reached.
        start
            .checked_add(self.0)
            .is_some_and(|end| Instant::now() > end)
    }
}

/// Create a [`Timeout`] stopper.
pub fn timeout(limit: Duration) -> Timeout {
    Timeout(limit)
}

/// Stops once a fixed instant has passed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// Stop after `at`.
    pub fn new(at: Instant) -> Self {
        Self { at: Some(at) }
    }

    /// Stop after a wall-clock time, mapped onto the monotonic clock now.
    ///
    /// Times too far in the future to represent as an [`Instant`] never trigger.
    pub fn from_system_time(at: SystemTime) -> Self {
        let now = Instant::now();
        let at = match at.duration_since(SystemTime::now()) {
            Ok(ahead) => now.checked_add(ahead),
            Err(behind) => Some(now.checked_sub(behind.duration()).unwrap_or(now)),
        };
        Self { at }
    }

    /// The instant after which this stopper fires, if representable.
    pub fn at(&self) -> Option<Instant> {
        self.at
    }
}

impl<E: ?Sized> Stopper<E> for Deadline {
    fn stop(&self, _start: Instant, _attempts: u32, _error: &E) -> bool {
        self.at.is_some_and(|at| Instant::now() > at)
    }
}

/// Create a [`Deadline`] stopper.
pub fn deadline(at: Instant) -> Deadline {
    Deadline::new(at)
}

/// OR combinator: stops when either stopper does. The second is not consulted when the
/// first already stops.
#[derive(Clone, Copy, Debug)]
pub struct Or<S1, S2>(pub S1, pub S2);

impl<E: ?Sized, S1: Stopper<E>, S2: Stopper<E>> Stopper<E> for Or<S1, S2> {
    #[inline]
    fn stop(&self, start: Instant, attempts: u32, error: &E) -> bool {
        self.0.stop(start, attempts, error) || self.1.stop(start, attempts, error)
    }
}

/// AND combinator: stops only when both stoppers do.
#[derive(Clone, Copy, Debug)]
pub struct And<S1, S2>(pub S1, pub S2);

impl<E: ?Sized, S1: Stopper<E>, S2: Stopper<E>> Stopper<E> for And<S1, S2> {
    #[inline]
    fn stop(&self, start: Instant, attempts: u32, error: &E) -> bool {
        self.0.stop(start, attempts, error) && self.1.stop(start, attempts, error)
    }
}

/// Stops when any member does, evaluating members in order.
///
/// An empty list never stops.
pub struct AnyOf<E: ?Sized>(Vec<SharedStopper<E>>);

impl<E: ?Sized> Stopper<E> for AnyOf<E> {
    fn stop(&self, start: Instant, attempts: u32, error: &E) -> bool {
        self.0.iter().any(|s| s.stop(start, attempts, error))
    }
}

/// Build an [`AnyOf`] from a list of stoppers.
///
/// ```rust
/// use relentless::retry::stop::*;
/// use std::time::{Duration, Instant};
///
/// let stopper = any_of::<(), _>([
///     shared_stopper(max_attempts(3)),
///     shared_stopper(timeout(Duration::from_secs(60))),
/// ]);
/// assert!(stopper.stop(Instant::now(), 3, &()));
/// ```
pub fn any_of<E, I>(stoppers: I) -> AnyOf<E>
where
    E: ?Sized,
    I: IntoIterator<Item = SharedStopper<E>>,
{
    AnyOf(stoppers.into_iter().collect())
}

/// Stops only when every member does, evaluating members in order.
///
/// An empty list always stops.
pub struct AllOf<E: ?Sized>(Vec<SharedStopper<E>>);

impl<E: ?Sized> Stopper<E> for AllOf<E> {
    fn stop(&self, start: Instant, attempts: u32, error: &E) -> bool {
        self.0.iter().all(|s| s.stop(start, attempts, error))
    }
}

/// Build an [`AllOf`] from a list of stoppers.
pub fn all_of<E, I>(stoppers: I) -> AllOf<E>
where
    E: ?Sized,
    I: IntoIterator<Item = SharedStopper<E>>,
{
    AllOf(stoppers.into_iter().collect())
}

impl<E: ?Sized> Clone for AnyOf<E> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<E: ?Sized> Clone for AllOf<E> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<E: ?Sized> fmt::Debug for AnyOf<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyOf").field("members", &self.0.len()).finish()
    }
}

impl<E: ?Sized> fmt::Debug for AllOf<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllOf").field("members", &self.0.len()).finish()
    }
}
