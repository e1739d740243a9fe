//! Best-effort "latest value" cell.
//!
//! A [`PublishedSlot`] has no flow control: `store()` overwrites whatever
//! is there and `load()` returns whatever was stored last. It carries
//! telemetry (ring positions, the last distortion result) that readers may
//! use for display or dumps but never for control decisions.

use core::marker::PhantomData;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Values that fit in one machine word and can be published through a slot.
pub trait SlotValue: Copy {
    /// Encode as raw bits.
    fn to_bits(self) -> usize;

    /// Decode from raw bits produced by [`to_bits()`](Self::to_bits).
    fn from_bits(bits: usize) -> Self;
}

impl SlotValue for usize {
    fn to_bits(self) -> usize {
        self
    }

    fn from_bits(bits: usize) -> Self {
        bits
    }
}

impl SlotValue for u32 {
    fn to_bits(self) -> usize {
        self as usize
    }

    fn from_bits(bits: usize) -> Self {
        bits as u32
    }
}

impl SlotValue for i32 {
    fn to_bits(self) -> usize {
        self as u32 as usize
    }

    fn from_bits(bits: usize) -> Self {
        bits as u32 as i32
    }
}

impl SlotValue for f32 {
    fn to_bits(self) -> usize {
        f32::to_bits(self) as usize
    }

    fn from_bits(bits: usize) -> Self {
        f32::from_bits(bits as u32)
    }
}

impl SlotValue for bool {
    fn to_bits(self) -> usize {
        self as usize
    }

    fn from_bits(bits: usize) -> Self {
        bits != 0
    }
}

/// Single-writer, unsynchronized latest-value cell.
///
/// A word-sized atomic with relaxed ordering: each individual value is read
/// whole, but two slots read back to back may come from different updates.
#[repr(C)]
pub struct PublishedSlot<T> {
    bits: AtomicUsize,
    _marker: PhantomData<T>,
}

impl<T: SlotValue> PublishedSlot<T> {
    /// Create a slot holding the all-zero bit pattern (0, 0.0 or `false`).
    pub const fn new() -> Self {
        PublishedSlot {
            bits: AtomicUsize::new(0),
            _marker: PhantomData,
        }
    }

    /// Replace the stored value.
    #[inline]
    pub fn store(&self, value: T) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Read the most recently stored value.
    #[inline]
    pub fn load(&self) -> T {
        T::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl<T: SlotValue> Default for PublishedSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
