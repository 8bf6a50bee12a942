//! Classification of operation failures.

use std::fmt;

/// How an operation failed, and whether the executor may try again.
///
/// Operations return `Result<T, Failure<E>>`. [`Failure::Retry`] feeds the stopper and
/// delayer; [`Failure::Stop`] ends the execution immediately without consulting
/// either. Plain errors convert into `Retry`, so `?` inside an operation retries by
/// default:
///
/// ```rust
/// use relentless::retry::Failure;
///
/// fn read_config() -> Result<String, Failure<std::io::Error>> {
///     let text = std::fs::read_to_string("/nonexistent/relentless.toml")?;
///     Ok(text)
/// }
///
/// assert!(matches!(read_config(), Err(Failure::Retry(_))));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Failure<E> {
    /// A transient error; retrying may succeed.
    Retry(E),
    /// A deliberate abort; the error is returned without further attempts.
    Stop(E),
}

impl<E> Failure<E> {
    /// Create a retryable failure.
    pub fn retry(error: E) -> Self {
        Self::Retry(error)
    }

    /// Create a stop request.
    pub fn stop(error: E) -> Self {
        Self::Stop(error)
    }

    /// Map an HTTP status onto a failure for network clients.
    ///
    /// Client errors (4xx) will not succeed on repetition and stop the execution, except
    /// 408 Request Timeout and 429 Too Many Requests. Everything else (5xx, unexpected
    /// codes) is retried.
    ///
    /// ```rust
    /// use relentless::retry::Failure;
    ///
    /// assert!(Failure::from_http_status(404, "not found").is_stop());
    /// assert!(Failure::from_http_status(429, "slow down").is_retry());
    /// assert!(Failure::from_http_status(503, "unavailable").is_retry());
    /// ```
    pub fn from_http_status(status: u16, error: E) -> Self {
        match status {
            408 | 429 => Self::Retry(error),
            400..=499 => Self::Stop(error),
            _ => Self::Retry(error),
        }
    }

    /// Returns true for [`Failure::Retry`].
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }

    /// Returns true for [`Failure::Stop`].
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop(_))
    }

    /// Borrow the underlying error.
    pub fn error(&self) -> &E {
        match self {
            Self::Retry(e) | Self::Stop(e) => e,
        }
    }

    /// Discard the classification.
    pub fn into_inner(self) -> E {
        match self {
            Self::Retry(e) | Self::Stop(e) => e,
        }
    }

    /// Transform the error, keeping the classification.
    pub fn map<F, G>(self, f: G) -> Failure<F>
    where
        G: FnOnce(E) -> F,
    {
        match self {
            Self::Retry(e) => Failure::Retry(f(e)),
            Self::Stop(e) => Failure::Stop(f(e)),
        }
    }
}

impl<E> From<E> for Failure<E> {
    fn from(error: E) -> Self {
        Self::Retry(error)
    }
}

impl<E: fmt::Display> fmt::Display for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retry(e) => write!(f, "retryable: {}", e),
            Self::Stop(e) => write!(f, "stop: {}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Failure<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error())
    }
}
