//! Error types.
//!
//! Construction failures are [`QueueError`]. A rejected push is a plain
//! [`Full`] value; an empty pop is `None`. Both are expected under
//! backpressure and stay off the error path.

use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

/// Errors that can occur while constructing a queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Heap-resident slot storage could not be allocated.
    #[error("failed to allocate slot storage: {0}")]
    Allocation(#[from] TryReserveError),
}

/// Returned by the producer when the queue has no free slot.
///
/// Carries back whatever was handed to the push call, so move-only values
/// are never lost.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Returns the rejected value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Full").finish_non_exhaustive()
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is full")
    }
}

impl<T> std::error::Error for Full<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_returns_value() {
        let err = Full(String::from("payload"));
        assert_eq!(err.to_string(), "queue is full");
        assert_eq!(err.into_inner(), "payload");
    }

    #[test]
    fn test_full_debug_does_not_require_debug_payload() {
        struct Opaque;
        assert_eq!(format!("{:?}", Full(Opaque)), "Full { .. }");
    }

    #[test]
    fn test_allocation_error_message() {
        let reserve = Vec::<u8>::new().try_reserve_exact(usize::MAX).unwrap_err();
        let err = QueueError::from(reserve);
        assert!(err.to_string().starts_with("failed to allocate slot storage"));
    }
}
