//! Cross-context access to the sample ring.
//!
//! The interrupt writes the ring every sample period; the analyzer reads
//! it occasionally. The analyzer masks the producing interrupt while it
//! holds the ring, so the interrupt never finds the lock taken. That is
//! the only mutual exclusion on sample data.
//!
//! Diagnostic readers never take the lock. They use
//! [`peek_span()`](SharedRing::peek_span), which reads the backing storage
//! directly and may return samples the interrupt is overwriting.

use core::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use spin::Mutex;

use super::RingBuffer;

/// Masks the local sample interrupt for the duration of a closure.
///
/// On Cortex-M this is `cortex_m::interrupt::free` (or masking only the
/// I²S interrupt in the NVIC). Host builds use [`Unmasked`].
pub trait IrqMask {
    fn masked<R>(&self, f: impl FnOnce() -> R) -> R;
}

/// No-op mask for hosted targets where the producer is a thread, not an interrupt.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmasked;

impl IrqMask for Unmasked {
    #[inline]
    fn masked<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }
}

/// A [`RingBuffer`] shared between the sample interrupt and the analyzer.
pub struct SharedRing<B> {
    ring: Mutex<RingBuffer<B>>,
    /// Address of `self` when `storage` was published; 0 until the first
    /// [`produce()`](Self::produce).
    owner: AtomicUsize,
    /// Base of the backing storage.
    storage: AtomicPtr<i32>,
    /// Length of the backing storage.
    capacity: AtomicUsize,
}

impl<B: AsRef<[i32]> + AsMut<[i32]>> SharedRing<B> {
    pub const fn new(ring: RingBuffer<B>) -> Self {
        SharedRing {
            ring: Mutex::new(ring),
            owner: AtomicUsize::new(0),
            storage: AtomicPtr::new(core::ptr::null_mut()),
            capacity: AtomicUsize::new(0),
        }
    }

    /// Producer access, from the sample interrupt.
    #[inline]
    pub fn produce<R>(&self, f: impl FnOnce(&mut RingBuffer<B>) -> R) -> R {
        let mut ring = self.ring.lock();
        let this = self as *const Self as usize;
        if self.owner.load(Ordering::Relaxed) != this {
            self.storage.store(ring.storage_ptr(), Ordering::Relaxed);
            self.capacity.store(ring.capacity(), Ordering::Relaxed);
            self.owner.store(this, Ordering::Release);
        }
        f(&mut ring)
    }

    /// Consumer access with the producing interrupt masked.
    ///
    /// Keep `f` short: no samples are captured while it runs.
    pub fn snapshot<M: IrqMask, R>(&self, irq: &M, f: impl FnOnce(&RingBuffer<B>) -> R) -> R {
        irq.masked(|| f(&self.ring.lock()))
    }

    /// Number of buffered samples, read with the producing interrupt masked.
    pub fn used<M: IrqMask>(&self, irq: &M) -> usize {
        self.snapshot(irq, |ring| ring.used())
    }

    /// Copy raw ring slots `from..to` (wrapping) into `out` without locking.
    ///
    /// Positions are the ones published in the shared region. Samples the
    /// producer is writing at the same time may come back stale or torn, so
    /// this is for dumps and displays only. Returns the number of samples
    /// copied and the position after the last one. Nothing is copied before
    /// the first [`produce()`](Self::produce) at the ring's current address.
    pub fn peek_span(&self, from: usize, to: usize, out: &mut [i32]) -> (usize, usize) {
        if self.owner.load(Ordering::Acquire) != self as *const Self as usize {
            return (0, from);
        }
        let base = self.storage.load(Ordering::Relaxed);
        let capacity = self.capacity.load(Ordering::Relaxed);
        if from >= capacity || to >= capacity {
            return (0, from);
        }

        let span = if to >= from { to - from } else { capacity - from + to };
        let n = span.min(out.len());
        let mut pos = from;
        for slot in &mut out[..n] {
            // SAFETY: `pos < capacity`, and `base`/`capacity` describe the
            // storage owned by this ring at its current address, which lives
            // as long as `&self`. The read is volatile and accepts a value the
            // producer is concurrently replacing.
            *slot = unsafe { base.add(pos).read_volatile() };
            pos += 1;
            if pos == capacity {
                pos = 0;
            }
        }
        (n, pos)
    }
}
