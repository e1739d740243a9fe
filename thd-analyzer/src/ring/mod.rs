//! Circular store of audio samples.
//!
//! The DSP interrupt appends two samples per period (raw input, then
//! filtered input) and the analyzer pulls recent windows out of it long
//! after they were written. The buffer never grows: once full, the oldest
//! samples are overwritten.
//!
//! Backing storage is any `AsRef<[i32]> + AsMut<[i32]>`: a fixed array on
//! host, or a `&'static mut [i32]` over external SDRAM on target.

mod range;
mod shared;

pub use range::DelayRange;
pub use shared::{IrqMask, SharedRing, Unmasked};

use crate::error::{Error, Result};

/// Fixed-capacity circular buffer of `i32` samples.
///
/// Invariant: `used() + free() == capacity()`.
pub struct RingBuffer<B> {
    buffer: B,
    /// Index of the oldest sample (read cursor).
    start: usize,
    /// Number of buffered samples; the write cursor is `start + len`.
    len: usize,
}

impl<B: AsRef<[i32]> + AsMut<[i32]>> RingBuffer<B> {
    /// Wrap `buffer` as an empty ring.
    ///
    /// # Panics
    ///
    /// Panics if `buffer` is empty.
    pub fn new(buffer: B) -> Self {
        assert!(!buffer.as_ref().is_empty(), "ring buffer needs at least one slot");
        RingBuffer {
            buffer,
            start: 0,
            len: 0,
        }
    }

    /// Total number of sample slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().len()
    }

    /// Number of buffered samples.
    #[inline]
    pub fn used(&self) -> usize {
        self.len
    }

    /// Number of samples that can be inserted before the oldest is overwritten.
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity() - self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Append one sample, overwriting the oldest one if the ring is full.
    #[inline]
    pub fn insert(&mut self, value: i32) {
        if self.is_full() {
            self.start = self.wrap(self.start + 1);
            self.len -= 1;
        }
        let end = self.end_index();
        self.buffer.as_mut()[end] = value;
        self.len += 1;
    }

    /// Append one sample only if there is room.
    ///
    /// Returns `false` (and drops `value`) if the ring is full.
    #[inline]
    pub fn try_insert(&mut self, value: i32) -> bool {
        if self.is_full() {
            return false;
        }
        self.insert(value);
        true
    }

    /// Consume up to `n` of the oldest samples.
    pub fn advance(&mut self, n: usize) {
        let n = n.min(self.len);
        self.start = self.wrap(self.start + n);
        self.len -= n;
    }

    /// Discard all buffered samples.
    pub fn clear(&mut self) {
        self.start = self.end_index();
        self.len = 0;
    }

    /// Ring index of the oldest buffered sample.
    pub fn oldest_position(&self) -> usize {
        self.start
    }

    /// Ring index one past the newest buffered sample.
    pub fn latest_position(&self) -> usize {
        self.end_index()
    }

    /// The oldest buffered sample.
    pub fn oldest(&self) -> Option<i32> {
        (!self.is_empty()).then(|| self.buffer.as_ref()[self.start])
    }

    /// The newest buffered sample.
    pub fn latest(&self) -> Option<i32> {
        if self.is_empty() {
            return None;
        }
        let last = self.wrap(self.start + self.len - 1);
        Some(self.buffer.as_ref()[last])
    }

    /// Cursor over the `delay` most recent samples, oldest first.
    ///
    /// If fewer than `delay` samples are buffered, the cursor first yields
    /// `delay - used()` zeros, so its length is always `delay`.
    pub fn delay_range(&self, delay: usize) -> DelayRange<'_> {
        if delay > self.len {
            DelayRange::new(self.buffer.as_ref(), self.start, self.len, delay - self.len)
        } else {
            let first = self.wrap(self.start + self.len - delay);
            DelayRange::new(self.buffer.as_ref(), first, delay, 0)
        }
    }

    /// Copy the `out.len()` oldest samples into `out` without consuming them.
    ///
    /// Slots beyond `used()` are zero-filled.
    pub fn copy(&self, out: &mut [i32]) {
        let n = out.len().min(self.len);
        self.copy_from(self.start, &mut out[..n]);
        out[n..].fill(0);
    }

    /// Copy the `out.len()` samples that end `delay` samples before the newest.
    ///
    /// `delay == 0` copies the most recent samples. Cursors are not touched.
    pub fn copy_delayed(&self, out: &mut [i32], delay: usize) -> Result<()> {
        let requested = out.len().saturating_add(delay);
        if requested > self.len {
            return Err(Error::InsufficientData {
                requested,
                available: self.len,
            });
        }
        let first = self.wrap(self.start + self.len - requested);
        self.copy_from(first, out);
        Ok(())
    }

    /// Copy raw ring slots `from..to` (wrapping at the end) into `out`.
    ///
    /// Positions are the indices published by
    /// [`oldest_position()`](Self::oldest_position) and
    /// [`latest_position()`](Self::latest_position). Copies at most
    /// `out.len()` samples and returns how many were copied.
    pub fn copy_span(&self, from: usize, to: usize, out: &mut [i32]) -> usize {
        let cap = self.capacity();
        if from >= cap || to >= cap {
            return 0;
        }
        let span = if to >= from { to - from } else { cap - from + to };
        let n = span.min(out.len());
        self.copy_from(from, &mut out[..n]);
        n
    }

    /// Base of the backing storage, for lock-free readers.
    pub(super) fn storage_ptr(&mut self) -> *mut i32 {
        self.buffer.as_mut().as_mut_ptr()
    }

    fn copy_from(&self, first: usize, out: &mut [i32]) {
        let buffer = self.buffer.as_ref();
        let n = out.len();
        let head = n.min(buffer.len() - first);
        out[..head].copy_from_slice(&buffer[first..first + head]);
        out[head..].copy_from_slice(&buffer[..n - head]);
    }

    #[inline]
    fn end_index(&self) -> usize {
        self.wrap(self.start + self.len)
    }

    #[inline]
    fn wrap(&self, index: usize) -> usize {
        let cap = self.capacity();
        if index >= cap {
            index - cap
        } else {
            index
        }
    }
}
