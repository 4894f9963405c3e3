//! Slot storage.
//!
//! A queue owns `N` slots, each aligned to two cache lines so that the
//! producer filling slot `i + 1` never contends with the consumer draining
//! slot `i`. Where the slots live is chosen by the storage type:
//!
//! - [`Inline`] keeps the array inside the queue value itself. Cheapest to
//!   construct and touch, but the whole footprint moves through the stack on
//!   construction, so it is capped at [`STACK_BYTES`].
//! - [`Boxed`] makes a single heap allocation at construction and never
//!   allocates again.
//!
//! Whether a slot holds a live `T` is not tracked here; the cursors define it.
//! Slots in `[read_index, write_index)` are occupied, all others vacant.

use std::mem::MaybeUninit;

use super::cell::SlotCell;
use crate::error::QueueError;

/// Assumed size of one cache line, in bytes.
pub const CACHE_LINE: usize = 64;

/// Largest slot footprint, in bytes, that [`Inline`] storage accepts.
pub const STACK_BYTES: usize = 512 * 1024;

/// Bytes occupied by the slots of a `N`-slot queue of `T`.
pub const fn footprint<T, const N: usize>() -> usize {
    N.saturating_mul(size_of::<Slot<T>>())
}

/// `true` when a `N`-slot queue of `T` may use [`Inline`] storage.
pub const fn fits_inline<T, const N: usize>() -> bool {
    footprint::<T, N>() <= STACK_BYTES
}

/// One element slot, padded to two cache lines.
#[repr(C, align(128))]
pub struct Slot<T> {
    value: SlotCell<MaybeUninit<T>>,
}

const _: () = assert!(align_of::<Slot<u8>>() == 2 * CACHE_LINE);

impl<T> Slot<T> {
    pub(crate) const fn vacant() -> Self {
        Self {
            value: SlotCell::new(MaybeUninit::uninit()),
        }
    }

    /// Moves `value` into the slot.
    ///
    /// # Safety
    ///
    /// The slot must be vacant and owned by the producer.
    #[inline(always)]
    pub(crate) unsafe fn write(&self, value: T) {
        // SAFETY: The producer has exclusive access to a vacant slot.
        unsafe {
            (*self.value.as_ptr()).write(value);
        }
    }

    /// Moves the value out, leaving the slot vacant.
    ///
    /// # Safety
    ///
    /// The slot must be occupied and owned by the consumer.
    #[inline(always)]
    pub(crate) unsafe fn take(&self) -> T {
        // SAFETY: The slot was initialised by the producer before it published
        // the write index the consumer acquired.
        unsafe { (*self.value.as_ptr()).assume_init_read() }
    }

    /// # Safety
    ///
    /// The slot must be occupied and owned by the consumer.
    #[inline(always)]
    pub(crate) unsafe fn get(&self) -> &T {
        // SAFETY: See `take`.
        unsafe { (*self.value.as_ptr()).assume_init_ref() }
    }

    /// # Safety
    ///
    /// The slot must be occupied and owned by the consumer, and no other
    /// reference into it may be live.
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn get_mut(&self) -> &mut T {
        // SAFETY: See `take`; uniqueness is the caller's contract.
        unsafe { (*self.value.as_ptr()).assume_init_mut() }
    }

    /// Drops the value in place, leaving the slot vacant.
    ///
    /// # Safety
    ///
    /// The slot must be occupied and no other thread may access the queue.
    pub(crate) unsafe fn drop_in_place(&self) {
        // SAFETY: Occupied slot, exclusive access (caller contract).
        unsafe { (*self.value.as_ptr()).assume_init_drop() }
    }
}

mod private {
    pub trait Sealed {}
}

/// Backing array of `N` slots. Implemented by [`Inline`] and [`Boxed`] only.
pub trait Storage<T, const N: usize>: private::Sealed + Sized {
    /// Name reported in diagnostics.
    const KIND: &'static str;

    /// Creates `N` vacant slots.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Allocation`] if heap storage cannot be obtained.
    fn allocate() -> Result<Self, QueueError>;

    /// Slot at `index`, which must be below `N`.
    fn slot(&self, index: usize) -> &Slot<T>;
}

/// Slots stored inside the queue value.
///
/// Using this storage for a footprint above [`STACK_BYTES`] fails to compile:
///
/// ```compile_fail
/// use spsc_ring::SpscQueue;
///
/// // 8192 slots * 128 bytes = 1 MiB
/// let queue = SpscQueue::<u64, 8192>::new();
/// ```
pub struct Inline<T, const N: usize> {
    slots: [Slot<T>; N],
}

impl<T, const N: usize> Inline<T, N> {
    const FITS: () = assert!(
        fits_inline::<T, N>(),
        "inline slot storage exceeds STACK_BYTES; use HeapQueue"
    );

    pub(crate) fn vacant() -> Self {
        let () = Self::FITS;

        Self {
            slots: [const { Slot::vacant() }; N],
        }
    }
}

impl<T, const N: usize> private::Sealed for Inline<T, N> {}

impl<T, const N: usize> Storage<T, N> for Inline<T, N> {
    const KIND: &'static str = "inline";

    fn allocate() -> Result<Self, QueueError> {
        Ok(Self::vacant())
    }

    #[inline(always)]
    fn slot(&self, index: usize) -> &Slot<T> {
        &self.slots[index]
    }
}

/// Slots in a single heap allocation made at construction.
pub struct Boxed<T, const N: usize> {
    slots: Box<[Slot<T>]>,
}

impl<T, const N: usize> private::Sealed for Boxed<T, N> {}

impl<T, const N: usize> Storage<T, N> for Boxed<T, N> {
    const KIND: &'static str = "boxed";

    fn allocate() -> Result<Self, QueueError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(N)?;
        slots.resize_with(N, Slot::vacant);

        Ok(Self {
            slots: slots.into_boxed_slice(),
        })
    }

    #[inline(always)]
    fn slot(&self, index: usize) -> &Slot<T> {
        &self.slots[index]
    }
}
