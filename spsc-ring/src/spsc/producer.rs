//! Write end of a queue.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Arc;

use minstant::Instant;

use super::Timeout;
use super::queue::SpscQueue;
use super::storage::{Inline, Storage};
use crate::error::Full;
use crate::sync;

/// The producing side of an [`SpscQueue`].
///
/// Exactly one `Producer` exists per queue. It is [`Send`] but not [`Sync`]:
/// it can move to another thread, but `&Producer` cannot be shared, so two
/// threads can never push concurrently.
pub struct Producer<'q, T, const N: usize, S: Storage<T, N> = Inline<T, N>> {
    queue: NonNull<SpscQueue<T, N, S>>,
    /// Keeps an [`Arc`]-shared queue alive; `None` for borrowed queues.
    owner: Option<Arc<SpscQueue<T, N, S>>>,
    _borrow: PhantomData<&'q SpscQueue<T, N, S>>,
}

// SAFETY: The producer role may run on any one thread; the queue is Sync for
// `T: Send`. `NonNull` keeps `Producer` !Sync.
unsafe impl<T: Send, const N: usize, S: Storage<T, N>> Send for Producer<'_, T, N, S> {}

impl<'q, T, const N: usize, S: Storage<T, N>> Producer<'q, T, N, S> {
    /// # Safety
    ///
    /// `queue` must stay valid for `'q` (or for as long as `owner` lives) and
    /// no other producer may exist for it.
    pub(crate) unsafe fn from_raw(
        queue: NonNull<SpscQueue<T, N, S>>,
        owner: Option<Arc<SpscQueue<T, N, S>>>,
    ) -> Self {
        Self {
            queue,
            owner,
            _borrow: PhantomData,
        }
    }

    #[inline(always)]
    fn queue(&self) -> &SpscQueue<T, N, S> {
        // SAFETY: Valid for the handle's lifetime (construction contract).
        unsafe { self.queue.as_ref() }
    }

    /// Attempts to push an item (wait-free).
    ///
    /// # Errors
    ///
    /// Returns [`Full`] with the item if every slot is taken.
    ///
    /// # Example
    ///
    /// ```
    /// use spsc_ring::{Full, SpscQueue};
    ///
    /// let mut queue = SpscQueue::<u32, 2>::new();
    /// let (mut tx, _rx) = queue.split();
    ///
    /// assert!(tx.try_push(1).is_ok());
    /// assert_eq!(tx.try_push(2), Err(Full(2)));
    /// ```
    #[inline]
    pub fn try_push(&mut self, item: T) -> Result<(), Full<T>> {
        // SAFETY: This handle is the queue's only producer.
        let pushed = unsafe { self.queue().try_push(item) };
        pushed.map_err(Full)
    }

    /// Pushes the value returned by `make`, building it straight into the slot.
    ///
    /// `make` is only called once a slot has been secured.
    ///
    /// # Errors
    ///
    /// Returns [`Full`] with `make`, uncalled, if every slot is taken.
    #[inline]
    pub fn try_push_with<F>(&mut self, make: F) -> Result<(), Full<F>>
    where
        F: FnOnce() -> T,
    {
        // SAFETY: This handle is the queue's only producer.
        let pushed = unsafe { self.queue().try_push_with(make) };
        pushed.map_err(Full)
    }

    /// Pushes an item, busy-spinning while the queue is full.
    ///
    /// The spin has no backoff, no yield and no way out: if the consumer
    /// stops draining, this never returns. Meant for producer/consumer pairs
    /// pinned to dedicated cores; otherwise prefer
    /// [`push_timeout`](Self::push_timeout).
    #[inline]
    pub fn force_push(&mut self, item: T) {
        // SAFETY: This handle is the queue's only producer.
        unsafe { self.queue().force_push_with(|| item) }
    }

    /// [`force_push`](Self::force_push) with in-place construction.
    #[inline]
    pub fn force_push_with<F>(&mut self, make: F)
    where
        F: FnOnce() -> T,
    {
        // SAFETY: This handle is the queue's only producer.
        unsafe { self.queue().force_push_with(make) }
    }

    /// Spins until space is available or the timeout elapses.
    ///
    /// [`Timeout::Infinite`], or a duration that overflows the clock, behaves
    /// like [`force_push`](Self::force_push).
    ///
    /// # Errors
    ///
    /// Returns [`Full`] with the item on timeout.
    pub fn push_timeout(&mut self, mut item: T, timeout: Timeout) -> Result<(), Full<T>> {
        let Some(deadline) = timeout.deadline() else {
            self.force_push(item);
            return Ok(());
        };
        loop {
            match self.try_push(item) {
                Ok(()) => return Ok(()),
                Err(Full(returned)) => {
                    if Instant::now() > deadline {
                        return Err(Full(returned));
                    }
                    item = returned;
                    sync::spin();
                }
            }
        }
    }

    /// Maximum number of queued elements (`N - 1`).
    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Snapshot of the number of queued elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue().len()
    }

    /// Snapshot of the number of free slots.
    #[inline]
    pub fn write_available(&self) -> usize {
        self.queue().write_available()
    }

    /// Snapshot: no element queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }

    /// Snapshot: no slot free.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.queue().is_full()
    }
}

impl<T, const N: usize, S: Storage<T, N>> fmt::Debug for Producer<'_, T, N, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("shared", &self.owner.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::spsc::channel;

    #[test]
    fn test_try_push_until_full() {
        let mut queue = SpscQueue::<u64, 8>::new();
        let (mut tx, _rx) = queue.split();

        for i in 0..7 {
            assert!(tx.try_push(i).is_ok(), "Failed to push item {i}");
        }
        assert!(tx.is_full());
        assert_eq!(tx.write_available(), 0);
        assert_eq!(tx.try_push(7), Err(Full(7)));
        assert_eq!(tx.len(), 7);
    }

    #[test]
    fn test_try_push_with_returns_closure_when_full() {
        let mut queue = SpscQueue::<String, 2>::new();
        let (mut tx, mut rx) = queue.split();

        tx.try_push_with(|| "first".to_string()).unwrap();
        let Err(Full(make)) = tx.try_push_with(|| "second".to_string()) else {
            panic!("queue should be full");
        };

        assert_eq!(rx.try_pop().as_deref(), Some("first"));
        tx.try_push_with(make).unwrap();
        assert_eq!(rx.try_pop().as_deref(), Some("second"));
    }

    #[test]
    fn test_force_push_with_space() {
        let mut queue = SpscQueue::<u64, 4>::new();
        let (mut tx, mut rx) = queue.split();

        tx.force_push(1);
        tx.force_push_with(|| 2);
        assert_eq!(rx.try_pop(), Some(1));
        assert_eq!(rx.try_pop(), Some(2));
    }

    #[test]
    fn test_push_timeout_expires() {
        let (mut tx, _rx) = channel::<u64, 2>();

        tx.push_timeout(1, Timeout::Infinite).unwrap();
        let err = tx
            .push_timeout(2, Duration::from_millis(5).into())
            .unwrap_err();
        assert_eq!(err.into_inner(), 2);
    }

    #[test]
    fn test_push_timeout_succeeds_when_drained() {
        let (mut tx, mut rx) = channel::<u64, 2>();
        tx.try_push(1).unwrap();

        let consumer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            rx.force_pop()
        });

        tx.push_timeout(2, Duration::from_secs(5).into()).unwrap();
        assert_eq!(consumer.join().unwrap(), 1);
    }

    #[test]
    fn test_push_timeout_with_unbounded_duration() {
        let (mut tx, mut rx) = channel::<u64, 4>();

        tx.push_timeout(1, Timeout::Duration(Duration::MAX)).unwrap();
        tx.push_timeout(2, Duration::from_secs(u64::MAX).into())
            .unwrap();
        assert_eq!(rx.try_pop(), Some(1));
        assert_eq!(rx.try_pop(), Some(2));
    }

    #[test]
    fn test_debug() {
        let (tx, _rx) = channel::<u8, 4>();
        let rendered = format!("{tx:?}");
        assert!(rendered.contains("capacity: 3"));
        assert!(rendered.contains("shared: true"));
    }
}
