use std::sync::atomic::{AtomicBool, Ordering};

/// Single-assignment latch deciding which path gets to end a payment flow.
///
/// Every terminal path (confirmation, failure, timeout, error cap, owner
/// cancellation) must win `try_resolve` before applying any side effect.
#[derive(Debug, Default)]
pub struct ResolutionGuard {
    resolved: AtomicBool,
}

impl ResolutionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for exactly one caller over the guard's lifetime.
    pub fn try_resolve(&self) -> bool {
        self.resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }
}
