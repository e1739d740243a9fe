//! Single-slot mailbox between two execution contexts.
//!
//! A mailbox holds at most one pending value. The writer spins until the
//! slot is free; the reader polls and never blocks. The only shared state is
//! a status word and the payload, so a mailbox can live in a RAM block that
//! both cores map at the same physical address.
//!
//! # Safety Contract
//!
//! - Only ONE context may write (the "producer").
//! - Only ONE context may read (the "consumer").
//! - The two may run concurrently on different cores or interrupt levels.

use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::mem::MaybeUninit;
use core::sync::atomic::{fence, AtomicU32, Ordering};

#[cfg(feature = "std")]
use crate::error::{Error, Result};

const STATUS_FREE: u32 = 0;
const STATUS_PENDING: u32 = 1;

/// A single-slot, at-most-one-pending message channel.
///
/// `#[repr(C)]` keeps the status word first and the payload after it, so
/// the footprint of a [`SharedRegion`](super::SharedRegion) is fixed at
/// compile time.
#[repr(C)]
pub struct Mailbox<T> {
    /// `STATUS_FREE` or `STATUS_PENDING`.
    status: AtomicU32,
    data: UnsafeCell<MaybeUninit<T>>,
}

// SAFETY: T: Send is required because values cross core/ISR boundaries.
// The payload is only written while the status is Free (by the sole producer)
// and only read while it is Pending (by the sole consumer); the status word
// hands ownership over with Release/Acquire ordering.
unsafe impl<T: Send> Sync for Mailbox<T> {}

impl<T: Copy> Mailbox<T> {
    /// Create an empty mailbox.
    pub const fn new() -> Self {
        Mailbox {
            status: AtomicU32::new(STATUS_FREE),
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Deliver `value`, spinning while a previous value is still pending.
    ///
    /// There is no timeout: if the peer never reads, this never returns.
    pub fn write(&self, value: T) {
        while self.status.load(Ordering::Acquire) != STATUS_FREE {
            spin_loop();
        }
        self.publish(value);
    }

    /// Deliver `value` if the slot is free.
    ///
    /// Returns `Err(value)` if a previous value is still pending.
    pub fn try_write(&self, value: T) -> core::result::Result<(), T> {
        if self.status.load(Ordering::Acquire) != STATUS_FREE {
            return Err(value);
        }
        self.publish(value);
        Ok(())
    }

    /// Like [`write()`](Self::write), but gives up after `timeout`.
    #[cfg(feature = "std")]
    pub fn write_timeout(&self, value: T, timeout: std::time::Duration) -> Result<()> {
        let deadline = std::time::Instant::now() + timeout;
        while self.status.load(Ordering::Acquire) != STATUS_FREE {
            if std::time::Instant::now() >= deadline {
                log::warn!("mailbox write timed out after {:?}", timeout);
                return Err(Error::Timeout);
            }
            std::thread::yield_now();
        }
        self.publish(value);
        Ok(())
    }

    /// Take the pending value, if any. Never blocks.
    pub fn read(&self) -> Option<T> {
        if self.status.load(Ordering::Acquire) != STATUS_PENDING {
            return None;
        }

        // SAFETY: We are the sole consumer and the status is Pending, so the
        // producer has finished writing and will not touch the payload until
        // we store Free below.
        let value = unsafe { (*self.data.get()).assume_init_read() };

        self.status.store(STATUS_FREE, Ordering::Release);
        Some(value)
    }

    /// Free the slot without copying the payload out.
    ///
    /// Returns `true` if a value was pending.
    pub fn discard(&self) -> bool {
        if self.status.load(Ordering::Acquire) != STATUS_PENDING {
            return false;
        }
        self.status.store(STATUS_FREE, Ordering::Release);
        true
    }

    /// `true` if a value is waiting to be read.
    pub fn can_read(&self) -> bool {
        self.status.load(Ordering::Acquire) == STATUS_PENDING
    }

    /// `true` if a write would complete without spinning.
    pub fn can_write(&self) -> bool {
        self.status.load(Ordering::Acquire) == STATUS_FREE
    }

    fn publish(&self, value: T) {
        // SAFETY: We are the sole producer and the status is Free, so the
        // consumer is not reading the payload.
        unsafe {
            (*self.data.get()).write(value);
        }
        self.status.store(STATUS_PENDING, Ordering::Release);
        // Full barrier so the other core observes payload and flag before
        // anything we do next.
        fence(Ordering::SeqCst);
    }
}

impl<T: Copy> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
