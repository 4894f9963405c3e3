//! Bounded single-producer/single-consumer ring buffer.
//!
//! One thread pushes, one thread pops, and the two never take a lock: the
//! only shared state is the slot array plus one atomic index per side.
//!
//! # Overview
//!
//! - [`SpscQueue`] - owns the slots; introspection and [`reset`](SpscQueue::reset)
//! - [`Producer`] - write end (exactly one per queue)
//! - [`Consumer`] - read end (exactly one per queue)
//! - [`Inline`] / [`Boxed`] - where the slots live
//!
//! # Example
//!
//! ```
//! use spsc_ring::SpscQueue;
//!
//! let mut queue = SpscQueue::<u64, 1024>::new();
//! let (mut tx, mut rx) = queue.split();
//!
//! tx.try_push(42).expect("queue full");
//! assert_eq!(rx.try_pop(), Some(42));
//! ```
//!
//! # Waiting
//!
//! `try_*` operations never wait. `force_*` operations busy-spin with no
//! backoff until they succeed and have no cancellation. `*_timeout`
//! operations spin up to a deadline.

mod cell;
mod consumer;
mod cursor;
mod producer;
mod queue;
mod storage;

use std::time::Duration;

use minstant::Instant;

pub use consumer::Consumer;
pub use producer::Producer;
pub use queue::{HeapQueue, SpscQueue, channel, try_channel};
pub use storage::{Boxed, CACHE_LINE, Inline, STACK_BYTES, Slot, Storage, fits_inline, footprint};

/// Timeout specification for the `*_timeout` operations.
#[derive(Debug, Clone, Copy)]
pub enum Timeout {
    /// Wait indefinitely.
    Infinite,
    /// Wait for at most the specified duration.
    Duration(Duration),
}

impl Timeout {
    /// Point at which a wait gives up, or `None` to wait forever.
    ///
    /// A duration too large to add to the current instant waits forever.
    pub(crate) fn deadline(self) -> Option<Instant> {
        match self {
            Self::Infinite => None,
            // minstant truncates the duration to u64 nanoseconds.
            Self::Duration(d) if d.as_nanos() > u128::from(u64::MAX) => None,
            Self::Duration(d) => Instant::now().checked_add(d),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline() {
        assert!(Timeout::Infinite.deadline().is_none());
        assert!(Timeout::Duration(Duration::MAX).deadline().is_none());
        // 2^64 ns + 5 ns must not wrap to a 5 ns deadline.
        let wrapping = Duration::from_nanos(u64::MAX) + Duration::from_nanos(6);
        assert!(Timeout::Duration(wrapping).deadline().is_none());

        let deadline = Timeout::from(Duration::from_secs(60)).deadline().unwrap();
        assert!(deadline > Instant::now());
    }
}
