//! The ring itself and its cursor protocol.
//!
//! # Protocol
//!
//! Indices are slot positions in `[0, N)` and wrap through `& (N - 1)`. One
//! slot always stays vacant, so `write == read` means empty and
//! `(write + 1) & mask == read` means full.
//!
//! ```text
//! producer: fill slot[write], then Release-store write_index = write + 1
//!                                   │
//!                                   ▼
//! consumer: Acquire-load write_index, then move out of slot[read]
//!           then Release-store read_index = read + 1
//!                                   │
//!                                   ▼
//! producer: Acquire-load read_index before reusing slot[read]
//! ```
//!
//! Each side also keeps a private copy of the peer's index and only issues
//! the Acquire load when that copy says the ring is full (producer) or empty
//! (consumer).
//!
//! # Safety
//!
//! The `unsafe` methods here are the raw protocol. Each is documented as
//! producer-only or consumer-only; calling one from the wrong side, or from
//! two threads on the same side, is a data race. [`Producer`] and
//! [`Consumer`] are the safe front ends that uphold this.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Arc;

use super::consumer::Consumer;
use super::cursor::{ReaderState, WriterState};
use super::producer::Producer;
use super::storage::{Boxed, Inline, Storage};
use crate::error::QueueError;
use crate::sync::{self, Ordering};
use crate::trace::{debug, error, trace};

/// Bounded single-producer/single-consumer ring buffer of `N` slots.
///
/// `N` must be a power of two and at least 2; the queue holds up to `N - 1`
/// elements. Non-power-of-two capacities fail to compile:
///
/// ```compile_fail
/// use spsc_ring::SpscQueue;
///
/// let queue = SpscQueue::<u64, 100>::new();
/// ```
///
/// The queue itself only offers introspection and [`reset`](Self::reset).
/// Elements move through the role handles returned by
/// [`split`](Self::split), or by [`channel`] when the two sides need to be
/// moved into spawned threads.
#[repr(C)]
pub struct SpscQueue<T, const N: usize, S: Storage<T, N> = Inline<T, N>> {
    writer: WriterState,
    reader: ReaderState,
    slots: S,
    _marker: PhantomData<T>,
}

/// Queue whose slots live in one heap allocation, for capacities too large
/// to construct inline.
pub type HeapQueue<T, const N: usize> = SpscQueue<T, N, Boxed<T, N>>;

impl<T, const N: usize> SpscQueue<T, N> {
    /// Creates an empty queue with inline slots.
    ///
    /// # Example
    ///
    /// ```
    /// use spsc_ring::SpscQueue;
    ///
    /// let mut queue = SpscQueue::<u32, 8>::new();
    /// assert_eq!(queue.capacity(), 7);
    ///
    /// let (mut tx, mut rx) = queue.split();
    /// tx.try_push(1).unwrap();
    /// assert_eq!(rx.try_pop(), Some(1));
    /// ```
    #[must_use]
    pub fn new() -> Self {
        let () = Self::POWER_OF_TWO;

        Self::with_slots(Inline::vacant())
    }
}

impl<T, const N: usize> Default for SpscQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize, S: Storage<T, N>> SpscQueue<T, N, S> {
    const MASK: usize = N - 1;

    const POWER_OF_TWO: () = assert!(
        N >= 2 && N.is_power_of_two(),
        "SpscQueue capacity N must be a power of two and at least 2"
    );

    /// Creates an empty queue with any storage.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Allocation`] if heap storage cannot be obtained.
    /// No partially built queue is ever returned.
    ///
    /// # Example
    ///
    /// ```
    /// use spsc_ring::HeapQueue;
    ///
    /// let queue = HeapQueue::<u64, 65536>::try_new()?;
    /// assert_eq!(queue.capacity(), 65535);
    /// # Ok::<(), spsc_ring::QueueError>(())
    /// ```
    pub fn try_new() -> Result<Self, QueueError> {
        let () = Self::POWER_OF_TWO;

        let slots = match S::allocate() {
            Ok(slots) => slots,
            Err(err) => {
                error!(
                    storage = S::KIND,
                    slots = N,
                    bytes = super::storage::footprint::<T, N>(),
                    error = %err,
                    "slot storage allocation failed"
                );
                return Err(err);
            }
        };
        Ok(Self::with_slots(slots))
    }

    fn with_slots(slots: S) -> Self {
        debug!(
            storage = S::KIND,
            capacity = N - 1,
            bytes = super::storage::footprint::<T, N>(),
            "queue constructed"
        );

        Self {
            writer: WriterState::new(),
            reader: ReaderState::new(),
            slots,
            _marker: PhantomData,
        }
    }

    /// Splits the queue into its producer and consumer handles.
    ///
    /// The handles borrow the queue, so it cannot be reset or dropped while
    /// either is alive. Use [`std::thread::scope`] to hand them to threads.
    ///
    /// # Example
    ///
    /// ```
    /// use spsc_ring::SpscQueue;
    ///
    /// let mut queue = SpscQueue::<u64, 64>::new();
    /// let (mut tx, mut rx) = queue.split();
    ///
    /// std::thread::scope(|s| {
    ///     s.spawn(move || (0..100).for_each(|i| tx.force_push(i)));
    ///     s.spawn(move || {
    ///         for i in 0..100 {
    ///             assert_eq!(rx.force_pop(), i);
    ///         }
    ///     });
    /// });
    /// ```
    pub fn split(&mut self) -> (Producer<'_, T, N, S>, Consumer<'_, T, N, S>) {
        let queue = NonNull::from(&*self);

        // SAFETY: `queue` outlives both handles through the `&mut self`
        // borrow, and exactly one handle of each role is created.
        unsafe { (Producer::from_raw(queue, None), Consumer::from_raw(queue, None)) }
    }

    /// Maximum number of elements the queue holds at once (`N - 1`).
    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Number of elements in the queue.
    ///
    /// Loads both cursors, so this is slower than a push or pop, and while
    /// the other side is active the result is only a snapshot.
    #[inline]
    pub fn len(&self) -> usize {
        let write = self.writer.write_index.load(Ordering::Acquire);
        let read = self.reader.read_index.load(Ordering::Acquire);
        if write >= read {
            write - read
        } else {
            (N - read) + write
        }
    }

    /// Same as [`len`](Self::len).
    #[inline]
    pub fn read_available(&self) -> usize {
        self.len()
    }

    /// Free slots; `capacity() - len()`. A snapshot, like [`len`](Self::len).
    #[inline]
    pub fn write_available(&self) -> usize {
        self.capacity() - self.len()
    }

    /// `true` if the queue holds no element. A snapshot.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.writer.write_index.load(Ordering::Acquire)
            == self.reader.read_index.load(Ordering::Acquire)
    }

    /// `true` if the queue holds `capacity()` elements. A snapshot.
    #[inline]
    pub fn is_full(&self) -> bool {
        let write = self.writer.write_index.load(Ordering::Acquire);
        let read = self.reader.read_index.load(Ordering::Acquire);
        (write + 1) & Self::MASK == read
    }

    /// Empties the queue without releasing its storage.
    ///
    /// Drops any remaining elements, then zeroes both cursors and both
    /// cached indices. Returns how many elements were dropped. Taking
    /// `&mut self` guarantees no handle is alive.
    ///
    /// If an element's `Drop` panics, the panic propagates with the elements
    /// after it still queued; they are dropped with the queue.
    ///
    /// # Example
    ///
    /// ```
    /// use spsc_ring::SpscQueue;
    ///
    /// let mut queue = SpscQueue::<u8, 4>::new();
    /// {
    ///     let (mut tx, _rx) = queue.split();
    ///     tx.try_push(1).unwrap();
    ///     tx.try_push(2).unwrap();
    /// }
    /// assert_eq!(queue.reset(), 2);
    /// assert!(queue.is_empty());
    /// ```
    pub fn reset(&mut self) -> usize {
        let dropped = self.drop_live();
        self.writer.clear();
        self.reader.clear();
        trace!(dropped, "queue reset");
        dropped
    }

    /// Drops every occupied slot, leaving `read_index == write_index`.
    ///
    /// The read cursor moves past a slot before its value is dropped, so if
    /// that `Drop` panics the slot is already vacant and a later call
    /// resumes with the next one.
    fn drop_live(&mut self) -> usize {
        let write = self.writer.write_index.load(Ordering::Relaxed);
        // The cache must never lag `read_index`, or a vacant slot reads as
        // occupied once the cursor passes it.
        *self.reader.write_index_cache.get_mut() = write;
        let mut dropped = 0;

        loop {
            let read = self.reader.read_index.load(Ordering::Relaxed);
            if read == write {
                break;
            }
            self.reader
                .read_index
                .store((read + 1) & Self::MASK, Ordering::Relaxed);
            dropped += 1;
            // SAFETY: `read` was in `[read, write)`, so occupied, and is now
            // outside the live range. `&mut self` excludes every other
            // accessor.
            unsafe { self.slots.slot(read).drop_in_place() };
        }
        dropped
    }

    // ------------------------------------------------------------------
    // Producer side
    // ------------------------------------------------------------------

    /// Returns the write index if a slot is free.
    ///
    /// # Safety
    ///
    /// Producer only.
    #[inline(always)]
    unsafe fn claim_write(&self) -> Option<usize> {
        let write = self.writer.write_index.load(Ordering::Relaxed);
        let next = (write + 1) & Self::MASK;

        // SAFETY: The producer owns `read_index_cache`.
        if next == unsafe { self.writer.read_index_cache.read() } {
            let read = self.reader.read_index.load(Ordering::Acquire);
            // SAFETY: As above.
            unsafe { self.writer.read_index_cache.write(read) };
            if next == read {
                return None;
            }
        }
        Some(write)
    }

    /// Fills slot `write` and publishes it to the consumer.
    ///
    /// # Safety
    ///
    /// Producer only, with `write` returned by `claim_write`.
    #[inline(always)]
    unsafe fn commit_write(&self, write: usize, value: T) {
        // SAFETY: `claim_write` proved the slot vacant; the consumer cannot
        // reach it until the store below.
        unsafe { self.slots.slot(write).write(value) };
        self.writer
            .write_index
            .store((write + 1) & Self::MASK, Ordering::Release);
    }

    /// # Safety
    ///
    /// Producer only.
    #[inline]
    pub(crate) unsafe fn try_push(&self, value: T) -> Result<(), T> {
        // SAFETY: Forwarded producer contract.
        match unsafe { self.claim_write() } {
            Some(write) => {
                // SAFETY: Slot claimed above.
                unsafe { self.commit_write(write, value) };
                Ok(())
            }
            None => Err(value),
        }
    }

    /// Calls `make` only once a slot is secured.
    ///
    /// # Safety
    ///
    /// Producer only.
    #[inline]
    pub(crate) unsafe fn try_push_with<F: FnOnce() -> T>(&self, make: F) -> Result<(), F> {
        // SAFETY: Forwarded producer contract.
        match unsafe { self.claim_write() } {
            Some(write) => {
                // SAFETY: Slot claimed above. If `make` panics nothing has
                // been published.
                unsafe { self.commit_write(write, make()) };
                Ok(())
            }
            None => Err(make),
        }
    }

    /// Spins until a slot frees up, then fills it with `make()`.
    ///
    /// # Safety
    ///
    /// Producer only.
    #[inline]
    pub(crate) unsafe fn force_push_with<F: FnOnce() -> T>(&self, make: F) {
        let write = loop {
            // SAFETY: Forwarded producer contract.
            if let Some(write) = unsafe { self.claim_write() } {
                break write;
            }
            sync::spin();
        };
        // SAFETY: Slot claimed above.
        unsafe { self.commit_write(write, make()) };
    }

    // ------------------------------------------------------------------
    // Consumer side
    // ------------------------------------------------------------------

    /// Returns the read index if a slot is occupied.
    ///
    /// # Safety
    ///
    /// Consumer only.
    #[inline(always)]
    unsafe fn claim_read(&self) -> Option<usize> {
        let read = self.reader.read_index.load(Ordering::Relaxed);

        // SAFETY: The consumer owns `write_index_cache`.
        if read == unsafe { self.reader.write_index_cache.read() } {
            let write = self.writer.write_index.load(Ordering::Acquire);
            // SAFETY: As above.
            unsafe { self.reader.write_index_cache.write(write) };
            if read == write {
                return None;
            }
        }
        Some(read)
    }

    /// Moves the value out of slot `read` and hands the slot back.
    ///
    /// # Safety
    ///
    /// Consumer only, with `read` returned by `claim_read`.
    #[inline(always)]
    unsafe fn take_read(&self, read: usize) -> T {
        // SAFETY: `claim_read` acquired a write index past `read`, so the
        // producer's fill of this slot is visible.
        let value = unsafe { self.slots.slot(read).take() };
        self.reader
            .read_index
            .store((read + 1) & Self::MASK, Ordering::Release);
        value
    }

    /// # Safety
    ///
    /// Consumer only.
    #[inline]
    pub(crate) unsafe fn try_pop(&self) -> Option<T> {
        // SAFETY: Forwarded consumer contract.
        unsafe {
            let read = self.claim_read()?;
            Some(self.take_read(read))
        }
    }

    /// Spins until an element arrives, then moves it out.
    ///
    /// # Safety
    ///
    /// Consumer only.
    #[inline]
    pub(crate) unsafe fn force_pop(&self) -> T {
        let read = loop {
            // SAFETY: Forwarded consumer contract.
            if let Some(read) = unsafe { self.claim_read() } {
                break read;
            }
            sync::spin();
        };
        // SAFETY: Slot claimed above.
        unsafe { self.take_read(read) }
    }

    /// Oldest element, left in place.
    ///
    /// # Safety
    ///
    /// Consumer only. The reference must be dropped before the consumer
    /// removes the element.
    #[inline]
    pub(crate) unsafe fn front(&self) -> Option<&T> {
        // SAFETY: Forwarded consumer contract; the slot stays occupied until
        // the consumer itself advances `read_index`.
        unsafe {
            let read = self.claim_read()?;
            Some(self.slots.slot(read).get())
        }
    }

    /// # Safety
    ///
    /// Consumer only, and no other reference to the front element may be
    /// live.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn front_mut(&self) -> Option<&mut T> {
        // SAFETY: As for `front`, with uniqueness from the caller.
        unsafe {
            let read = self.claim_read()?;
            Some(self.slots.slot(read).get_mut())
        }
    }
}

impl<T, const N: usize, S: Storage<T, N>> Drop for SpscQueue<T, N, S> {
    fn drop(&mut self) {
        let dropped = self.drop_live();
        if dropped > 0 {
            trace!(dropped, "dropped remaining elements with queue");
        }
    }
}

impl<T, const N: usize, S: Storage<T, N>> fmt::Debug for SpscQueue<T, N, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpscQueue")
            .field("storage", &S::KIND)
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

// SAFETY: The queue owns its elements; sending it sends them.
unsafe impl<T: Send, const N: usize, S: Storage<T, N>> Send for SpscQueue<T, N, S> {}

// SAFETY: Shared access is mediated by the cursor protocol. Each element is
// only ever touched by one thread at a time (producer before publish,
// consumer after acquire), so `T: Send` is enough.
unsafe impl<T: Send, const N: usize, S: Storage<T, N>> Sync for SpscQueue<T, N, S> {}

/// Creates a queue with inline slots behind an [`Arc`] and returns its
/// handles, which can be moved into spawned threads.
///
/// # Example
///
/// ```
/// use spsc_ring::channel;
///
/// let (mut tx, mut rx) = channel::<String, 16>();
///
/// let producer = std::thread::spawn(move || tx.force_push("hello".to_string()));
/// assert_eq!(rx.force_pop(), "hello");
/// producer.join().unwrap();
/// ```
#[must_use]
pub fn channel<T, const N: usize>() -> (Producer<'static, T, N>, Consumer<'static, T, N>) {
    share(Arc::new(SpscQueue::new()))
}

/// Like [`channel`], for any storage.
///
/// # Errors
///
/// Returns [`QueueError::Allocation`] if heap storage cannot be obtained.
pub fn try_channel<T, const N: usize, S: Storage<T, N>>()
-> Result<(Producer<'static, T, N, S>, Consumer<'static, T, N, S>), QueueError> {
    Ok(share(Arc::new(SpscQueue::try_new()?)))
}

fn share<T, const N: usize, S: Storage<T, N>>(
    queue: Arc<SpscQueue<T, N, S>>,
) -> (Producer<'static, T, N, S>, Consumer<'static, T, N, S>) {
    let ptr = NonNull::from(&*queue);

    // SAFETY: Each handle holds an `Arc`, so the queue outlives both, and
    // exactly one handle of each role is created.
    unsafe {
        (
            Producer::from_raw(ptr, Some(Arc::clone(&queue))),
            Consumer::from_raw(ptr, Some(queue)),
        )
    }
}
