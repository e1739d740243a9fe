//! Flat-top window tables, one per power-of-two size.
//!
//! The window is a five-term cosine sum with very low passband ripple, so
//! a harmonic that falls between bins is still measured at its true level.
//! Tables share one storage slice: the table for size `n` lives at
//! `storage[n..2n]`, so every size from [`MIN_FFT_SIZE`] up to the maximum
//! fits in `2 * max` floats. Each table is computed on first use.

use crate::constants::{MAX_FFT_SIZE, MIN_FFT_SIZE};
use crate::error::{Error, Result};

const A0: f32 = 1.0;
const A1: f32 = 1.93;
const A2: f32 = 1.29;
const A3: f32 = 0.388;
const A4: f32 = 0.028;

/// Window coefficient `i` of a table of `size` points.
pub fn flat_top(i: usize, size: usize) -> f32 {
    let phase = i as f32 * (2.0 * core::f64::consts::PI / (size as f64 - 1.0)) as f32;
    A0 - A1 * libm::cosf(phase) + A2 * libm::cosf(2.0 * phase) - A3 * libm::cosf(3.0 * phase)
        + A4 * libm::cosf(4.0 * phase)
}

/// Lazily populated window tables over caller-provided storage.
pub struct WindowTable<'a> {
    storage: &'a mut [f32],
    max_size: usize,
    /// Bit `log2(n)` is set once the table for size `n` is valid.
    built: u32,
}

impl<'a> WindowTable<'a> {
    /// Use `storage` for tables up to `max_size` points.
    ///
    /// `max_size` must be a power of two in `MIN_FFT_SIZE..=MAX_FFT_SIZE`
    /// and `storage` must hold at least `2 * max_size` values.
    pub fn new(storage: &'a mut [f32], max_size: usize) -> Result<Self> {
        if !max_size.is_power_of_two()
            || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&max_size)
            || storage.len() < 2 * max_size
        {
            return Err(Error::InvalidLength(max_size));
        }
        Ok(WindowTable {
            storage,
            max_size,
            built: 0,
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// The window for `size` points, computing it if needed.
    pub fn window(&mut self, size: usize) -> Result<&[f32]> {
        if !size.is_power_of_two() || !(MIN_FFT_SIZE..=self.max_size).contains(&size) {
            return Err(Error::InvalidLength(size));
        }
        let bit = 1u32 << size.trailing_zeros();
        let table = &mut self.storage[size..2 * size];
        if self.built & bit == 0 {
            for (i, w) in table.iter_mut().enumerate() {
                *w = flat_top(i, size);
            }
            self.built |= bit;
        }
        Ok(table)
    }

    /// Compute every table up front.
    pub fn prepare_all(&mut self) {
        let mut size = MIN_FFT_SIZE;
        while size <= self.max_size {
            // Sizes in range are always valid
            let _ = self.window(size);
            size <<= 1;
        }
    }

    /// `true` once the table for `size` has been computed.
    pub fn is_built(&self, size: usize) -> bool {
        size.is_power_of_two() && self.built & (1u32 << size.trailing_zeros()) != 0
    }
}
