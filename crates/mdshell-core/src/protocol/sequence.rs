//! Thread-safe counter for bridge request correlation ids.
//!
//! Every request sent to the page carries an id; the page echoes it in its
//! reply.  Ids only need to be unique among requests that are in flight at the
//! same time, but handing out a strictly increasing sequence also keeps the
//! logs easy to follow.
//!
//! The counter is an `AtomicU64`, so the control loop thread and any async
//! task can draw ids concurrently without a lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// A lock-free, monotonically increasing id source.
///
/// Wraps from `u64::MAX` back to 0 without panicking.
///
/// # Examples
///
/// ```rust
/// use mdshell_core::protocol::SequenceCounter;
///
/// let ids = SequenceCounter::starting_at(1);
/// assert_eq!(ids.next(), 1);
/// assert_eq!(ids.next(), 2);
/// ```
#[derive(Debug)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    /// Creates a counter whose first id is 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a counter whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            inner: AtomicU64::new(first),
        }
    }

    /// Returns the next id and advances the counter.
    ///
    /// `Relaxed` is enough: the value is only used as a label, never to
    /// publish other memory.
    pub fn next(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}
