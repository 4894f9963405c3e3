//! Per-role cursor state.
//!
//! Each side owns one cache line: an atomically published index that the
//! peer reads, plus a private copy of the peer's index that spares the
//! common path an atomic load.

use super::cell::{ReaderCell, WriterCell};
use crate::sync::AtomicUsize;

/// Producer side: write index plus cached read index.
#[repr(C, align(64))]
pub struct WriterState {
    /// Next slot to fill. Stored by the producer, loaded by the consumer.
    pub write_index: AtomicUsize,

    /// Last read index observed by the producer.
    pub read_index_cache: WriterCell<usize>,
}

impl WriterState {
    pub fn new() -> Self {
        Self {
            write_index: AtomicUsize::new(0),
            read_index_cache: WriterCell::new(0),
        }
    }

    /// Zeroes both fields. `&mut` proves neither side is mid-operation.
    pub fn clear(&mut self) {
        self.write_index.store(0, crate::sync::Ordering::Relaxed);
        *self.read_index_cache.get_mut() = 0;
    }
}

/// Consumer side: read index plus cached write index.
#[repr(C, align(64))]
pub struct ReaderState {
    /// Next slot to drain. Stored by the consumer, loaded by the producer.
    pub read_index: AtomicUsize,

    /// Last write index observed by the consumer.
    pub write_index_cache: ReaderCell<usize>,
}

impl ReaderState {
    pub fn new() -> Self {
        Self {
            read_index: AtomicUsize::new(0),
            write_index_cache: ReaderCell::new(0),
        }
    }

    /// Zeroes both fields. `&mut` proves neither side is mid-operation.
    pub fn clear(&mut self) {
        self.read_index.store(0, crate::sync::Ordering::Relaxed);
        *self.write_index_cache.get_mut() = 0;
    }
}
