//! Read end of a queue.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Arc;

use minstant::Instant;

use super::Timeout;
use super::queue::SpscQueue;
use super::storage::{Inline, Storage};
use crate::sync;

/// The consuming side of an [`SpscQueue`].
///
/// Exactly one `Consumer` exists per queue. See [`Producer`](super::Producer)
/// for the thread-safety rules, which are the same.
pub struct Consumer<'q, T, const N: usize, S: Storage<T, N> = Inline<T, N>> {
    queue: NonNull<SpscQueue<T, N, S>>,
    /// Keeps an [`Arc`]-shared queue alive; `None` for borrowed queues.
    owner: Option<Arc<SpscQueue<T, N, S>>>,
    _borrow: PhantomData<&'q SpscQueue<T, N, S>>,
}

// SAFETY: See `Producer`.
unsafe impl<T: Send, const N: usize, S: Storage<T, N>> Send for Consumer<'_, T, N, S> {}

impl<'q, T, const N: usize, S: Storage<T, N>> Consumer<'q, T, N, S> {
    /// # Safety
    ///
    /// `queue` must stay valid for `'q` (or for as long as `owner` lives) and
    /// no other consumer may exist for it.
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

    /// Removes the oldest element (wait-free). `None` if the queue is empty.
    #[inline]
    #[must_use]
    pub fn try_pop(&mut self) -> Option<T> {
        // SAFETY: This handle is the queue's only consumer.
        unsafe { self.queue().try_pop() }
    }

    /// Removes the oldest element, busy-spinning while the queue is empty.
    ///
    /// Same contract as [`Producer::force_push`](super::Producer::force_push):
    /// if nothing is ever pushed, this never returns.
    #[inline]
    pub fn force_pop(&mut self) -> T {
        // SAFETY: This handle is the queue's only consumer.
        unsafe { self.queue().force_pop() }
    }

    /// Spins until an element arrives or the timeout elapses.
    ///
    /// Returns `None` on timeout. A duration that overflows the clock waits
    /// forever, like [`Timeout::Infinite`].
    #[must_use]
    pub fn pop_timeout(&mut self, timeout: Timeout) -> Option<T> {
        let Some(deadline) = timeout.deadline() else {
            return Some(self.force_pop());
        };
        loop {
            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if Instant::now() > deadline {
                return None;
            }
            sync::spin();
        }
    }

    /// Removes and drops the oldest element. `false` if the queue is empty.
    #[inline]
    pub fn discard(&mut self) -> bool {
        self.try_pop().is_some()
    }

    /// Removes and drops the oldest element, busy-spinning while empty.
    #[inline]
    pub fn force_discard(&mut self) {
        drop(self.force_pop());
    }

    /// Removes the oldest element and passes it to `f` by value.
    ///
    /// Returns `false`, without calling `f`, if the queue is empty. The slot
    /// is released before `f` runs.
    ///
    /// # Example
    ///
    /// ```
    /// use spsc_ring::SpscQueue;
    ///
    /// let mut queue = SpscQueue::<u32, 8>::new();
    /// let (mut tx, mut rx) = queue.split();
    ///
    /// let mut sum = 0;
    /// assert!(!rx.consume_one(|v| sum += v));
    ///
    /// tx.try_push(10).unwrap();
    /// assert!(rx.consume_one(|v| sum += v));
    /// assert_eq!(sum, 10);
    /// ```
    #[inline]
    pub fn consume_one<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(T),
    {
        match self.try_pop() {
            Some(item) => {
                f(item);
                true
            }
            None => false,
        }
    }

    /// Calls `f` on every element until the queue is observed empty.
    /// Returns the number consumed.
    ///
    /// This drains what is available; it does not wait for more. Against a
    /// producer that keeps up, it keeps going.
    pub fn consume_all<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(T),
    {
        let mut consumed = 0;
        while self.consume_one(&mut f) {
            consumed += 1;
        }
        consumed
    }

    /// Like [`consume_all`](Self::consume_all), stopping after at most `n`
    /// elements.
    pub fn consume_n<F>(&mut self, mut f: F, n: usize) -> usize
    where
        F: FnMut(T),
    {
        let mut consumed = 0;
        while consumed < n && self.consume_one(&mut f) {
            consumed += 1;
        }
        consumed
    }

    /// The element the next pop will return, left in place.
    ///
    /// # Example
    ///
    /// ```
    /// use spsc_ring::SpscQueue;
    ///
    /// let mut queue = SpscQueue::<&str, 4>::new();
    /// let (mut tx, mut rx) = queue.split();
    ///
    /// assert_eq!(rx.front(), None);
    /// tx.try_push("a").unwrap();
    /// assert_eq!(rx.front(), Some(&"a"));
    /// assert_eq!(rx.try_pop(), Some("a"));
    /// ```
    #[inline]
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        // SAFETY: This handle is the queue's only consumer, and every removal
        // takes `&mut self`, so the slot outlives the returned borrow.
        unsafe { self.queue().front() }
    }

    /// Mutable access to the element the next pop will return.
    #[inline]
    #[must_use]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        // SAFETY: As for `front`; `&mut self` makes the borrow unique.
        unsafe { self.queue().front_mut() }
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

    /// Same as [`len`](Self::len).
    #[inline]
    pub fn read_available(&self) -> usize {
        self.queue().read_available()
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

impl<T, const N: usize, S: Storage<T, N>> fmt::Debug for Consumer<'_, T, N, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
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
    fn test_basic_push_pop() {
        let mut queue = SpscQueue::<u64, 8>::new();
        let (mut tx, mut rx) = queue.split();

        assert!(tx.try_push(42).is_ok());
        assert_eq!(rx.try_pop(), Some(42));
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_interleaved_operations() {
        let mut queue = SpscQueue::<u64, 8>::new();
        let (mut tx, mut rx) = queue.split();

        tx.try_push(1).unwrap();
        tx.try_push(2).unwrap();
        assert_eq!(rx.try_pop(), Some(1));
        tx.try_push(3).unwrap();
        assert_eq!(rx.try_pop(), Some(2));
        assert_eq!(rx.try_pop(), Some(3));
        tx.try_push(4).unwrap();
        tx.try_push(5).unwrap();
        assert_eq!(rx.try_pop(), Some(4));
        assert_eq!(rx.try_pop(), Some(5));
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_discard() {
        let mut queue = SpscQueue::<String, 4>::new();
        let (mut tx, mut rx) = queue.split();

        assert!(!rx.discard());
        tx.try_push("a".into()).unwrap();
        tx.try_push("b".into()).unwrap();
        assert!(rx.discard());
        rx.force_discard();
        assert!(rx.is_empty());
    }

    #[test]
    fn test_consume_n_stops_at_limit() {
        let mut queue = SpscQueue::<u32, 8>::new();
        let (mut tx, mut rx) = queue.split();
        for i in 0..5 {
            tx.try_push(i).unwrap();
        }

        let mut seen = Vec::new();
        assert_eq!(rx.consume_n(|v| seen.push(v), 3), 3);
        assert_eq!(seen, [0, 1, 2]);
        assert_eq!(rx.consume_n(|v| seen.push(v), 10), 2);
        assert_eq!(seen, [0, 1, 2, 3, 4]);
        assert_eq!(rx.consume_n(|v| seen.push(v), 0), 0);
    }

    #[test]
    fn test_consume_all() {
        let mut queue = SpscQueue::<u32, 8>::new();
        let (mut tx, mut rx) = queue.split();
        for i in 0..5 {
            tx.try_push(i).unwrap();
        }

        let mut sum = 0;
        let consumed = rx.consume_all(|v| sum += v);
        assert_eq!(consumed, 5);
        assert_eq!(sum, 10);
        assert!(rx.is_empty());
        assert_eq!(rx.consume_all(|_| unreachable!()), 0);
    }

    #[test]
    fn test_front_mut() {
        let mut queue = SpscQueue::<Vec<u8>, 4>::new();
        let (mut tx, mut rx) = queue.split();

        assert!(rx.front_mut().is_none());
        tx.try_push(vec![1]).unwrap();
        rx.front_mut().unwrap().push(2);
        assert_eq!(rx.try_pop(), Some(vec![1, 2]));
    }

    #[test]
    fn test_pop_timeout() {
        let (mut tx, mut rx) = channel::<u64, 4>();

        assert_eq!(rx.pop_timeout(Duration::from_millis(5).into()), None);

        let producer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            tx.force_push(9);
        });
        assert_eq!(rx.pop_timeout(Timeout::Infinite), Some(9));
        producer.join().unwrap();
    }

    #[test]
    fn test_pop_timeout_with_unbounded_duration() {
        let (mut tx, mut rx) = channel::<u64, 4>();
        tx.try_push(7).unwrap();

        assert_eq!(rx.pop_timeout(Timeout::Duration(Duration::MAX)), Some(7));
    }

    #[test]
    fn test_read_available() {
        let (mut tx, rx) = channel::<u8, 8>();
        tx.try_push(1).unwrap();
        tx.try_push(2).unwrap();
        assert_eq!(rx.read_available(), 2);
        assert_eq!(rx.len(), 2);
        assert!(!rx.is_full());
        assert!(format!("{rx:?}").contains("len: 2"));
    }
}
