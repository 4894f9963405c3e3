//! Role-tagged interior mutability.
//!
//! Every non-atomic field of the queue belongs to exactly one side of the
//! protocol. `RoleCell<T, Role>` records that owner in the type: a
//! [`WriterCell`] and a [`ReaderCell`] holding the same `T` are different
//! types, so a cache owned by one side cannot be handed to code written for
//! the other.

use std::cell::UnsafeCell;
use std::marker::PhantomData;

/// Owner marker: fields written and read only by the producer.
pub struct WriterRole;

/// Owner marker: fields written and read only by the consumer.
pub struct ReaderRole;

/// Owner marker: slot contents, whose owner changes hands through the cursors.
pub struct SlotRole;

/// `UnsafeCell<T>` with a phantom owner.
///
/// The role has no runtime representation.
#[repr(transparent)]
pub struct RoleCell<T, Role>(UnsafeCell<T>, PhantomData<Role>);

impl<T, Role> RoleCell<T, Role> {
    pub const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value), PhantomData)
    }

    /// Raw pointer to the contents.
    #[inline(always)]
    pub const fn as_ptr(&self) -> *mut T {
        self.0.get()
    }

    /// Exclusive access, available whenever no handle is outstanding.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.0.get_mut()
    }
}

impl<T: Copy, Role> RoleCell<T, Role> {
    /// Reads the value.
    ///
    /// # Safety
    ///
    /// The calling thread must be the cell's owner for `Role`.
    #[inline(always)]
    pub unsafe fn read(&self) -> T {
        // SAFETY: Only the owning thread touches this cell (caller contract).
        unsafe { *self.0.get() }
    }

    /// Overwrites the value.
    ///
    /// # Safety
    ///
    /// The calling thread must be the cell's owner for `Role`.
    #[inline(always)]
    pub unsafe fn write(&self, value: T) {
        // SAFETY: Only the owning thread touches this cell (caller contract).
        unsafe { *self.0.get() = value }
    }
}

// SAFETY: Each cell is accessed by a single thread at a time: role caches by
// their owner only, slots by whichever side the cursors currently grant them
// to. The Release/Acquire cursor updates order the hand-over.
unsafe impl<T: Send, Role> Sync for RoleCell<T, Role> {}
unsafe impl<T: Send, Role> Send for RoleCell<T, Role> {}

/// Cache owned by the producer.
pub type WriterCell<T> = RoleCell<T, WriterRole>;

/// Cache owned by the consumer.
pub type ReaderCell<T> = RoleCell<T, ReaderRole>;

/// Slot contents handed between producer and consumer.
pub type SlotCell<T> = RoleCell<T, SlotRole>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_cell_is_transparent() {
        assert_eq!(size_of::<WriterCell<usize>>(), size_of::<usize>());
        assert_eq!(align_of::<ReaderCell<u8>>(), align_of::<u8>());
    }

    #[test]
    fn test_read_write_roundtrip() {
        let cell = WriterCell::new(3usize);
        // SAFETY: Single-threaded test owns the cell.
        unsafe {
            cell.write(7);
            assert_eq!(cell.read(), 7);
        }
    }

    #[test]
    fn test_get_mut() {
        let mut cell = ReaderCell::new(1usize);
        *cell.get_mut() = 0;
        // SAFETY: Single-threaded test owns the cell.
        assert_eq!(unsafe { cell.read() }, 0);
    }
}
