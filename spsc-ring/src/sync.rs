//! Atomic primitives used by the cursor protocol.
//!
//! Under `--cfg loom` these resolve to loom's model-checked equivalents so the
//! push/pop orderings can be explored exhaustively by `tests/loom.rs`.

#[cfg(not(loom))]
pub(crate) use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicUsize, Ordering};

/// Busy-wait hint. Loom needs the yield to make progress through spin loops.
#[inline(always)]
pub(crate) fn spin() {
    #[cfg(not(loom))]
    std::hint::spin_loop();
    #[cfg(loom)]
    loom::hint::spin_loop();
}
