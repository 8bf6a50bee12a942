//! Ordered record of the retryable errors seen in one execution.

use std::slice;

/// Every retryable error an execution saw, oldest first.
///
/// Never empty: an execution only gives up after at least one failure, so the most
/// recent error is always available without an `Option`.
///
/// Retention is bounded. The executor keeps the oldest error and the most recent ones up
/// to the policy's [history limit](super::RetryPolicy::with_history_limit); errors evicted
/// from the middle are counted by [`ErrorHistory::dropped`].
///
/// ```rust
/// use relentless::retry::ErrorHistory;
///
/// let mut history = ErrorHistory::new("refused");
/// history.push("reset");
/// history.push("timed out");
///
/// assert_eq!(history.first(), &"refused");
/// assert_eq!(history.last(), &"timed out");
/// assert_eq!(history.len(), 3);
/// assert_eq!(history.into_vec(), vec!["refused", "reset", "timed out"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorHistory<E> {
    errors: Vec<E>,
    dropped: usize,
}

impl<E> ErrorHistory<E> {
    /// Start a history with its first error.
    pub fn new(first: E) -> Self {
        Self {
            errors: vec![first],
            dropped: 0,
        }
    }

    /// Build a history from earlier errors followed by the latest one.
    pub fn from_parts(mut earlier: Vec<E>, latest: E) -> Self {
        earlier.push(latest);
        Self {
            errors: earlier,
            dropped: 0,
        }
    }

    /// Build a history from a vector, or `None` if it is empty.
    pub fn from_vec(errors: Vec<E>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors, dropped: 0 })
        }
    }

    /// Record another error.
    pub fn push(&mut self, error: E) {
        self.errors.push(error);
    }

    /// Record another error, retaining at most `limit` errors.
    ///
    /// The oldest error is kept; beyond the limit the oldest of the rest is evicted and
    /// counted in [`dropped`](Self::dropped). A limit of 1 keeps only the latest error.
    pub fn push_bounded(&mut self, error: E, limit: usize) {
        self.errors.push(error);
        let limit = limit.max(1);
        while self.errors.len() > limit {
            let evict = if limit == 1 { 0 } else { 1 };
            self.errors.remove(evict);
            self.dropped += 1;
        }
    }

    /// Number of errors evicted to respect the retention limit.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Number of errors ever recorded, retained or dropped.
    pub fn total(&self) -> usize {
        self.errors.len().saturating_add(self.dropped)
    }

    /// The oldest error.
    pub fn first(&self) -> &E {
        &self.errors[0]
    }

    /// The most recent error.
    pub fn last(&self) -> &E {
        &self.errors[self.errors.len() - 1]
    }

    /// Number of retained errors, at least 1.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always false.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> slice::Iter<'_, E> {
        self.errors.iter()
    }

    /// View as a slice.
    pub fn as_slice(&self) -> &[E] {
        &self.errors
    }

    /// Take the most recent error, dropping the rest.
    pub fn into_last(mut self) -> E {
        match self.errors.pop() {
            Some(last) => last,
            None => unreachable!("ErrorHistory is never empty"),
        }
    }

    /// Transform every error, keeping the order.
    pub fn map<F, G>(self, f: G) -> ErrorHistory<F>
    where
        G: FnMut(E) -> F,
    {
        ErrorHistory {
            errors: self.errors.into_iter().map(f).collect(),
            dropped: self.dropped,
        }
    }

    /// Convert into a plain vector of the retained errors, oldest first.
    pub fn into_vec(self) -> Vec<E> {
        self.errors
    }
}

impl<E> IntoIterator for ErrorHistory<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a ErrorHistory<E> {
    type Item = &'a E;
    type IntoIter = slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
