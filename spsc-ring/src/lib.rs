//! Lock-free bounded SPSC ring buffer.
//!
//! A fixed-capacity queue for handing values from exactly one producer
//! thread to exactly one consumer thread without mutexes, condition
//! variables or syscalls. Capacity is a compile-time power of two; the hot
//! path touches one atomic store and, usually, no atomic load.
//!
//! See [`spsc`] for the queue and its handles.
//!
//! # Tracing
//!
//! Build with `--features tracing` and call [`init_tracing`] to log queue
//! construction, reset and teardown. Filter with `RUST_LOG`, e.g.
//! `RUST_LOG=spsc_ring=debug`.

pub mod error;
pub mod spsc;

mod sync;
mod trace;

pub use error::{Full, QueueError};
pub use spsc::{
    Boxed, CACHE_LINE, Consumer, HeapQueue, Inline, Producer, STACK_BYTES, SpscQueue, Storage,
    Timeout, channel, try_channel,
};
pub use trace::init_tracing;
