//! # Relentless
//!
//! Retry fallible operations with composable delay and stop strategies.
//!
//! A retry is split into three independent pieces:
//!
//! - a **Delayer** decides how long to wait after a failure
//! - a **Stopper** decides when to give up
//! - the **executor** calls the operation, classifies its result and sleeps
//!
//! Strategies are stateless values. Build them once, share them across threads, and
//! combine them freely: cap an exponential backoff, take the longer of two delays, stop
//! on "five attempts or thirty seconds, whichever comes first".
//!
//! ## Quick Example
//!
//! ```rust
//! use relentless::prelude::*;
//! use std::time::Duration;
//!
//! #[derive(Debug, PartialEq)]
//! enum FetchError {
//!     Unavailable,
//!     NotFound,
//! }
//!
//! let policy = RetryPolicy::new()
//!     .with_optional_delayer(limit(exponential(Duration::from_millis(1)), Duration::from_millis(10)))
//!     .with_stopper(Or(max_attempts(5), timeout(Duration::from_secs(10))));
//!
//! let mut calls = 0;
//! let result = retry(
//!     || {
//!         calls += 1;
//!         match calls {
//!             1 | 2 => Err(Failure::Retry(FetchError::Unavailable)),
//!             _ => Ok("payload"),
//!         }
//!     },
//!     &policy,
//! );
//! assert_eq!(result, Ok("payload"));
//!
//! // Permanent failures short-circuit without consulting the policy.
//! let result: Result<(), _> = retry(|| Err(Failure::Stop(FetchError::NotFound)), &policy);
//! assert_eq!(result.unwrap_err().into_error(), FetchError::NotFound);
//! ```
//!
//! ## Features
//!
//! - `jitter`: randomized delays via `rand`
//! - `tracing`: retry and exhaustion events via `tracing`
//! - `async`: [`retry_async`](retry::retry_async) on tokio
//! - `serde`: declarative policies in [`retry::config`]

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod retry;

// Re-exports
pub use retry::{
    retry, retry_with_hooks, ErrorHistory, Failure, RetryError, RetryEvent, RetryExhausted,
    RetryPolicy, RetryStopped,
};

#[cfg(feature = "async")]
pub use retry::{retry_async, retry_async_with_hooks};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::retry::delay::{
        exponential, fixed, limit, linear, max_of, min_of, shared_delayer, sum_of, Combine,
        Delayer, Exponential, Fixed, Limit, Linear, SharedDelayer,
    };
    pub use crate::retry::stop::{
        all_of, any_of, deadline, max_attempts, shared_stopper, timeout, And, Deadline,
        MaxAttempts, Or, SharedStopper, Stopper, Timeout,
    };
    pub use crate::retry::{
        retry, retry_with_hooks, ErrorHistory, Failure, RetryError, RetryEvent, RetryPolicy,
    };

    #[cfg(feature = "jitter")]
    pub use crate::retry::delay::{random, Random};

    #[cfg(feature = "async")]
    pub use crate::retry::{retry_async, retry_async_with_hooks};
}
