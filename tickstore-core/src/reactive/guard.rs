//! Flag Guards
//!
//! The store protects two windows against re-entrancy: the reducer call and
//! the listener fan-out of a flush. Both are modelled as a boolean flag that
//! is claimed on entry and released when the returned guard is dropped.
//!
//! Releasing on drop keeps the flag consistent even if the protected code
//! panics, so a reducer that blows up does not leave the store permanently
//! "reducing".

use std::sync::atomic::{AtomicBool, Ordering};

/// Guard that clears its flag when dropped.
#[must_use = "the flag is released as soon as the guard is dropped"]
pub struct FlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlagGuard<'a> {
    /// Claim `flag`.
    ///
    /// Returns `None` if the flag is already held.
    pub fn try_enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }

    /// Whether `flag` is currently held by some guard.
    pub fn is_held(flag: &AtomicBool) -> bool {
        flag.load(Ordering::Acquire)
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        let was_held = self.flag.swap(false, Ordering::AcqRel);
        debug_assert!(was_held, "FlagGuard released a flag it did not hold");
    }
}
