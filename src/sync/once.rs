//! Atomic one-shot flag.

use std::sync::atomic::{AtomicBool, Ordering};

/// A flag that can be set exactly once.
///
/// [`ensure_called_once`](OnceFlag::ensure_called_once) returns `true` only
/// for the caller that performs the `false -> true` transition; every other
/// caller, before or after, gets `false`.
#[derive(Debug, Default)]
pub struct OnceFlag {
    set: AtomicBool,
}

impl OnceFlag {
    pub const fn new() -> Self {
        Self {
            set: AtomicBool::new(false),
        }
    }

    /// Attempt the transition. Returns `true` if this call won it.
    pub fn ensure_called_once(&self) -> bool {
        self.set
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether the flag has been set.
    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }
}
