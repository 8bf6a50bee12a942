//! Retry execution with pluggable delay and stop strategies.
//!
//! This module splits retrying into three pieces:
//!
//! - **Delayer** ([`delay`]): how long to wait after a failure
//! - **Stopper** ([`stop`]): whether to give up after a failure
//! - **Executor** ([`retry`], [`retry_with_hooks`]): calls the operation, classifies the
//!   result, consults the policy and sleeps
//!
//! Delayers and stoppers are stateless and independent of each other. A
//! [`RetryPolicy`] pairs at most one of each; both halves are optional.
//!
//! # Quick Start
//!
//! ```rust
//! use relentless::retry::{retry, Failure, RetryPolicy};
//! use relentless::retry::delay::fixed;
//! use relentless::retry::stop::max_attempts;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new()
//!     .with_delayer(fixed(Duration::from_millis(1)))
//!     .with_stopper(max_attempts(3));
//!
//! let mut calls = 0;
//! let result = retry(
//!     || {
//!         calls += 1;
//!         if calls == 1 {
//!             Err(Failure::Retry("connection reset"))
//!         } else {
//!             Ok(calls)
//!         }
//!     },
//!     &policy,
//! );
//!
//! assert_eq!(result, Ok(2));
//! ```
//!
//! # Stopping Early
//!
//! An operation that knows retrying is pointless returns [`Failure::Stop`]. The
//! executor returns [`RetryError::Stopped`] at once, without consulting the stopper or
//! the delayer:
//!
//! ```rust
//! use relentless::retry::{retry, Failure, RetryPolicy};
//! use relentless::retry::stop::max_attempts;
//!
//! let policy = RetryPolicy::new().with_stopper(max_attempts(10));
//! let result = retry(|| Err::<(), _>(Failure::from_http_status(404, "not found")), &policy);
//!
//! let err = result.unwrap_err();
//! assert!(err.is_stopped());
//! assert_eq!(err.attempts(), 0);
//! ```
//!
//! # Error Types
//!
//! - [`RetryError::Exhausted`]: the stopper gave up; carries the retryable errors in
//!   order ([`ErrorHistory`]), bounded by [`RetryPolicy::with_history_limit`]
//! - [`RetryError::Stopped`]: the operation returned [`Failure::Stop`]
//!
//! # Features
//!
//! - `jitter`: [`delay::Random`]
//! - `async`: [`retry_async`] and [`retry_async_with_hooks`] on tokio
//! - `serde`: declarative policies in [`config`]
//! - `tracing`: debug events per retry, a warning on exhaustion

pub mod delay;
pub mod stop;

mod error;
mod executor;
mod history;
mod outcome;
mod policy;

#[cfg(feature = "serde")]
pub mod config;
#[cfg(feature = "async")]
mod future;

pub use error::{RetryError, RetryExhausted, RetryStopped};
pub use executor::{retry, retry_with_hooks, RetryEvent};
pub use history::ErrorHistory;
pub use outcome::Failure;
pub use policy::{RetryPolicy, DEFAULT_HISTORY_LIMIT};

#[cfg(feature = "async")]
pub use future::{retry_async, retry_async_with_hooks};
