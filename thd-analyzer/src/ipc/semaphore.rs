//! Binary semaphore for cooperative task sets.
//!
//! Holds at most one permit. `take()` does not busy-wait blindly: between
//! attempts it calls a caller-supplied idle hook, which on target yields to
//! the cooperative scheduler.

use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "std")]
use crate::error::{Error, Result};

/// A semaphore with a maximum count of one.
pub struct BinarySemaphore {
    permit: AtomicBool,
}

impl BinarySemaphore {
    /// Create a semaphore with no permit available.
    pub const fn new() -> Self {
        BinarySemaphore {
            permit: AtomicBool::new(false),
        }
    }

    /// Make the permit available. Giving twice still leaves one permit.
    pub fn give(&self) {
        self.permit.store(true, Ordering::Release);
    }

    /// Take the permit if it is available.
    pub fn try_take(&self) -> bool {
        self.permit
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Take the permit, calling `idle` between attempts until it is available.
    pub fn take(&self, mut idle: impl FnMut()) {
        while !self.try_take() {
            idle();
        }
    }

    /// Take the permit, yielding the thread, for at most `timeout`.
    #[cfg(feature = "std")]
    pub fn take_timeout(&self, timeout: std::time::Duration) -> Result<()> {
        let deadline = std::time::Instant::now() + timeout;
        while !self.try_take() {
            if std::time::Instant::now() >= deadline {
                return Err(Error::Timeout);
            }
            std::thread::yield_now();
        }
        Ok(())
    }

    /// `true` if a permit is currently available.
    pub fn is_available(&self) -> bool {
        self.permit.load(Ordering::Acquire)
    }
}

impl Default for BinarySemaphore {
    fn default() -> Self {
        Self::new()
    }
}
