//! Delay strategies and combinators.
//!
//! A [`Delayer`] answers one question after a retryable failure: how long should the
//! executor wait before calling the operation again? Delayers are pure functions of the
//! execution's start time, the number of failed attempts so far, and the latest error.
//! They hold no per-execution state, so one instance can back any number of concurrent
//! executions.
//!
//! # Leaf strategies
//!
//! - [`Fixed`]: the same delay every time
//! - [`Linear`]: `step * attempts`
//! - [`Exponential`]: `coefficient * 2^attempts`, with an overflow-safe exponent cap
//! - [`Random`]: `min_delay + uniform[0, max_jitter)` (requires the `jitter` feature)
//!
//! # Combinators
//!
//! - [`Limit`]: caps another delayer
//! - [`Combine`]: reduces several delayers with `min`, `max` or `sum`
//!
//! # Example
//!
//! ```rust
//! use relentless::retry::delay::*;
//! use std::time::{Duration, Instant};
//!
//! let backoff = exponential(Duration::from_millis(10)).expect("non-zero coefficient");
//! let capped = Limit::new(backoff, Duration::from_millis(50));
//!
//! let start = Instant::now();
//! assert_eq!(Delayer::<()>::delay(&capped, start, 1, &()), Duration::from_millis(20));
//! assert_eq!(Delayer::<()>::delay(&capped, start, 4, &()), Duration::from_millis(50));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Largest exponent applied by [`Exponential`] to a one-nanosecond coefficient.
///
/// Delays are computed as whole nanoseconds in a `u64`, so `1 << 63` is the largest
/// power of two that still fits. Larger coefficients lower the cap by
/// `floor(log2(coefficient))`.
pub const MAX_EXPONENT: u32 = u64::BITS - 1;

/// Computes the wait before the next attempt.
///
/// Implemented for every `Fn(Instant, u32, &E) -> Duration` closure, so ad-hoc
/// strategies need no wrapper type.
///
/// # Example
///
/// ```rust
/// use relentless::retry::delay::Delayer;
/// use std::time::{Duration, Instant};
///
/// let slow_on_timeouts = |_: Instant, _: u32, err: &&str| {
///     if err.contains("timeout") {
///         Duration::from_millis(500)
///     } else {
///         Duration::from_millis(10)
///     }
/// };
///
/// let start = Instant::now();
/// assert_eq!(slow_on_timeouts.delay(start, 1, &"read timeout"), Duration::from_millis(500));
/// assert_eq!(slow_on_timeouts.delay(start, 1, &"refused"), Duration::from_millis(10));
/// ```
pub trait Delayer<E: ?Sized>: Send + Sync {
    /// Delay before the next attempt, given the execution start, the number of failed
    /// attempts so far (at least 1) and the latest error.
    fn delay(&self, start: Instant, attempts: u32, error: &E) -> Duration;
}

impl<E: ?Sized, F> Delayer<E> for F
where
    F: Fn(Instant, u32, &E) -> Duration + Send + Sync,
{
    #[inline]
    fn delay(&self, start: Instant, attempts: u32, error: &E) -> Duration {
        self(start, attempts, error)
    }
}

/// A type-erased delayer that can be cloned and shared across threads.
///
/// Clones share the underlying strategy.
pub struct SharedDelayer<E: ?Sized>(Arc<dyn Delayer<E>>);

impl<E: ?Sized> SharedDelayer<E> {
    /// Erase the type of `delayer`.
    pub fn new<D>(delayer: D) -> Self
    where
        D: Delayer<E> + 'static,
    {
        Self(Arc::new(delayer))
    }

    /// Returns true if both handles point at the same strategy.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl<E: ?Sized> Delayer<E> for SharedDelayer<E> {
    #[inline]
    fn delay(&self, start: Instant, attempts: u32, error: &E) -> Duration {
        self.0.delay(start, attempts, error)
    }
}

impl<E: ?Sized> Clone for SharedDelayer<E> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<E: ?Sized> fmt::Debug for SharedDelayer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedDelayer(..)")
    }
}

/// Erase a delayer's type so it can sit next to other strategies in a
/// [`Combine`] list or a [`RetryPolicy`](crate::retry::RetryPolicy).
pub fn shared_delayer<E, D>(delayer: D) -> SharedDelayer<E>
where
    E: ?Sized,
    D: Delayer<E> + 'static,
{
    SharedDelayer::new(delayer)
}

/// Always waits the same amount of time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fixed(pub Duration);

impl Fixed {
    /// Create a fixed delayer.
    pub fn new(delay: Duration) -> Self {
        Self(delay)
    }
}

impl<E: ?Sized> Delayer<E> for Fixed {
    #[inline]
    fn delay(&self, _start: Instant, _attempts: u32, _error: &E) -> Duration {
        self.0
    }
}

/// Create a [`Fixed`] delayer.
pub fn fixed(delay: Duration) -> Fixed {
    Fixed(delay)
}

/// Waits `step * attempts`, saturating at [`Duration::MAX`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Linear(pub Duration);

impl Linear {
    /// Create a linear delayer.
    pub fn new(step: Duration) -> Self {
        Self(step)
    }
}

impl<E: ?Sized> Delayer<E> for Linear {
    #[inline]
    fn delay(&self, _start: Instant, attempts: u32, _error: &E) -> Duration {
        self.0.saturating_mul(attempts)
    }
}

/// Create a [`Linear`] delayer.
pub fn linear(step: Duration) -> Linear {
    Linear(step)
}

/// Waits `coefficient * 2^min(attempts, cap)`.
///
/// The cap is [`MAX_EXPONENT`] minus `floor(log2(coefficient_nanos))`, which keeps the
/// product inside a `u64` nanosecond count for every attempt number.
///
/// # Example
///
/// ```rust
/// use relentless::retry::delay::{Delayer, Exponential};
/// use std::time::{Duration, Instant};
///
/// let backoff = Exponential::new(Duration::from_millis(10)).unwrap();
/// let start = Instant::now();
///
/// assert_eq!(Delayer::<()>::delay(&backoff, start, 1, &()), Duration::from_millis(20));
/// assert_eq!(Delayer::<()>::delay(&backoff, start, 3, &()), Duration::from_millis(80));
///
/// // Huge attempt counts stop growing instead of overflowing.
/// let far = Delayer::<()>::delay(&backoff, start, 10_000, &());
/// assert_eq!(far, Delayer::<()>::delay(&backoff, start, backoff.max_exponent(), &()));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Exponential {
    coefficient_nanos: u64,
    max_exponent: u32,
}

impl Exponential {
    /// Create an exponential backoff delayer.
    ///
    /// Returns `None` when the coefficient is zero or does not fit in 64-bit
    /// nanoseconds; callers treat the absence as "no additional delay".
    pub fn new(coefficient: Duration) -> Option<Self> {
        let coefficient_nanos = u64::try_from(coefficient.as_nanos())
            .ok()
            .filter(|nanos| *nanos > 0)?;

        Some(Self {
            coefficient_nanos,
            max_exponent: MAX_EXPONENT - coefficient_nanos.ilog2(),
        })
    }

    /// The base delay multiplied by powers of two.
    pub fn coefficient(&self) -> Duration {
        Duration::from_nanos(self.coefficient_nanos)
    }

    /// The attempt count beyond which the delay stops growing.
    pub fn max_exponent(&self) -> u32 {
        self.max_exponent
    }
}

impl<E: ?Sized> Delayer<E> for Exponential {
    #[inline]
    fn delay(&self, _start: Instant, attempts: u32, _error: &E) -> Duration {
        let exponent = attempts.min(self.max_exponent);
        Duration::from_nanos(self.coefficient_nanos << exponent)
    }
}

/// Create an [`Exponential`] delayer, or `None` for an unusable coefficient.
pub fn exponential(coefficient: Duration) -> Option<Exponential> {
    Exponential::new(coefficient)
}

/// Waits `min_delay` plus a uniformly random jitter in `[0, max_jitter)`.
///
/// Each instance owns its own random source, so separate instances never produce
/// correlated sequences. A single instance may still be shared between threads.
#[cfg(feature = "jitter")]
pub struct Random {
    min_delay: Duration,
    max_jitter_nanos: u64,
    rng: std::sync::Mutex<rand::rngs::StdRng>,
}

#[cfg(feature = "jitter")]
impl Random {
    /// Create a randomized delayer seeded from the operating system.
    pub fn new(min_delay: Duration, max_jitter: Duration) -> Self {
        use rand::SeedableRng;
        Self::from_rng(min_delay, max_jitter, rand::rngs::StdRng::from_os_rng())
    }

    /// Create a randomized delayer with a deterministic seed.
    pub fn with_seed(min_delay: Duration, max_jitter: Duration, seed: u64) -> Self {
        use rand::SeedableRng;
        Self::from_rng(min_delay, max_jitter, rand::rngs::StdRng::seed_from_u64(seed))
    }

    fn from_rng(min_delay: Duration, max_jitter: Duration, rng: rand::rngs::StdRng) -> Self {
        Self {
            min_delay,
            max_jitter_nanos: u64::try_from(max_jitter.as_nanos()).unwrap_or(u64::MAX),
            rng: std::sync::Mutex::new(rng),
        }
    }

    /// The lower bound of every delay.
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// The exclusive upper bound of the random part.
    pub fn max_jitter(&self) -> Duration {
        Duration::from_nanos(self.max_jitter_nanos)
    }
}

#[cfg(feature = "jitter")]
impl<E: ?Sized> Delayer<E> for Random {
    fn delay(&self, _start: Instant, _attempts: u32, _error: &E) -> Duration {
        use rand::Rng;

        if self.max_jitter_nanos == 0 {
            return self.min_delay;
        }

        // A poisoned lock still holds a usable generator.
        let jitter = match self.rng.lock() {
            Ok(mut rng) => rng.random_range(0..self.max_jitter_nanos),
            Err(poisoned) => poisoned.into_inner().random_range(0..self.max_jitter_nanos),
        };
        self.min_delay.saturating_add(Duration::from_nanos(jitter))
    }
}

#[cfg(feature = "jitter")]
impl fmt::Debug for Random {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Random")
            .field("min_delay", &self.min_delay)
            .field("max_jitter", &self.max_jitter())
            .finish_non_exhaustive()
    }
}

/// Create a [`Random`] delayer.
#[cfg(feature = "jitter")]
pub fn random(min_delay: Duration, max_jitter: Duration) -> Random {
    Random::new(min_delay, max_jitter)
}

/// Caps another delayer: `min(inner.delay(..), cap)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limit<D> {
    inner: D,
    cap: Duration,
}

impl<D> Limit<D> {
    /// Cap `inner` at `cap`.
    pub fn new(inner: D, cap: Duration) -> Self {
        Self { inner, cap }
    }

    /// The upper bound on every delay.
    pub fn cap(&self) -> Duration {
        self.cap
    }

    /// The wrapped delayer.
    pub fn inner(&self) -> &D {
        &self.inner
    }
}

impl<E: ?Sized, D: Delayer<E>> Delayer<E> for Limit<D> {
    #[inline]
    fn delay(&self, start: Instant, attempts: u32, error: &E) -> Duration {
        self.inner.delay(start, attempts, error).min(self.cap)
    }
}

/// Cap an optional delayer. An absent inner delayer stays absent.
///
/// ```rust
/// use relentless::retry::delay::{exponential, limit};
/// use std::time::Duration;
///
/// assert!(limit(exponential(Duration::ZERO), Duration::from_secs(1)).is_none());
/// assert!(limit(exponential(Duration::from_millis(1)), Duration::from_secs(1)).is_some());
/// ```
pub fn limit<D>(inner: Option<D>, cap: Duration) -> Option<Limit<D>> {
    inner.map(|inner| Limit::new(inner, cap))
}

/// How [`Combine`] folds the delays of its members.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reduction {
    /// Shortest delay.
    Min,
    /// Longest delay.
    Max,
    /// Total of all delays, saturating at [`Duration::MAX`].
    Sum,
}

impl Reduction {
    /// Fold two delays.
    #[inline]
    pub fn apply(self, a: Duration, b: Duration) -> Duration {
        match self {
            Reduction::Min => a.min(b),
            Reduction::Max => a.max(b),
            Reduction::Sum => a.saturating_add(b),
        }
    }
}

/// Evaluates a list of delayers and reduces their delays to one.
///
/// Absent members (`None`) contribute [`Duration::ZERO`]. Note that this makes a
/// `Min` with any absent member always zero.
pub struct Combine<E: ?Sized> {
    reduction: Reduction,
    delayers: Vec<Option<SharedDelayer<E>>>,
}

impl<E: ?Sized> Combine<E> {
    /// Combine `delayers` with `reduction`. Returns `None` for an empty list.
    pub fn new<I>(reduction: Reduction, delayers: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<SharedDelayer<E>>>,
    {
        let delayers: Vec<_> = delayers.into_iter().collect();
        if delayers.is_empty() {
            return None;
        }
        Some(Self {
            reduction,
            delayers,
        })
    }

    /// The fold applied to member delays.
    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    /// Number of members, absent ones included.
    pub fn len(&self) -> usize {
        self.delayers.len()
    }

    /// Always false: empty combinations are never constructed.
    pub fn is_empty(&self) -> bool {
        self.delayers.is_empty()
    }
}

impl<E: ?Sized> Clone for Combine<E> {
    fn clone(&self) -> Self {
        Self {
            reduction: self.reduction,
            delayers: self.delayers.clone(),
        }
    }
}

impl<E: ?Sized> fmt::Debug for Combine<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Combine")
            .field("reduction", &self.reduction)
            .field("members", &self.delayers.len())
            .finish()
    }
}

impl<E: ?Sized> Delayer<E> for Combine<E> {
    fn delay(&self, start: Instant, attempts: u32, error: &E) -> Duration {
        self.delayers
            .iter()
            .map(|delayer| {
                delayer
                    .as_ref()
                    .map_or(Duration::ZERO, |d| d.delay(start, attempts, error))
            })
            .reduce(|a, b| self.reduction.apply(a, b))
            .unwrap_or(Duration::ZERO)
    }
}

/// Shortest delay among `delayers`, or `None` if the list is empty.
///
/// ```rust
/// use relentless::retry::delay::*;
/// use std::time::{Duration, Instant};
///
/// let d = min_of::<(), _>([
///     Some(shared_delayer(fixed(Duration::from_millis(30)))),
///     Some(shared_delayer(linear(Duration::from_millis(10)))),
/// ])
/// .unwrap();
///
/// assert_eq!(d.delay(Instant::now(), 2, &()), Duration::from_millis(20));
/// assert_eq!(d.delay(Instant::now(), 5, &()), Duration::from_millis(30));
/// ```
pub fn min_of<E, I>(delayers: I) -> Option<Combine<E>>
where
    E: ?Sized,
    I: IntoIterator<Item = Option<SharedDelayer<E>>>,
{
    Combine::new(Reduction::Min, delayers)
}

/// Longest delay among `delayers`, or `None` if the list is empty.
pub fn max_of<E, I>(delayers: I) -> Option<Combine<E>>
where
    E: ?Sized,
    I: IntoIterator<Item = Option<SharedDelayer<E>>>,
{
    Combine::new(Reduction::Max, delayers)
}

/// Sum of all delays in `delayers`, or `None` if the list is empty.
pub fn sum_of<E, I>(delayers: I) -> Option<Combine<E>>
where
    E: ?Sized,
    I: IntoIterator<Item = Option<SharedDelayer<E>>>,
{
    Combine::new(Reduction::Sum, delayers)
}
