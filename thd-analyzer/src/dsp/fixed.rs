//! Fixed-point helpers for the per-sample filter path.
//!
//! The biquad runs on `i64` accumulators with explicit wrapping, matching
//! the two's-complement behavior of the reference firmware bit for bit.

/// Quantize `value` to an integer with `scale` as the unit, rounding half up.
///
/// The product is formed in `f32` (as the coefficient design is) and the
/// rounding in `f64`.
#[inline]
pub fn quantize(value: f32, scale: f32) -> i32 {
    libm::floor((value * scale) as f64 + 0.5) as i32
}

/// `acc + coeff * x`, wrapping on overflow.
#[inline(always)]
pub fn mul_acc(acc: i64, coeff: i32, x: i64) -> i64 {
    acc.wrapping_add((coeff as i64).wrapping_mul(x))
}

/// `acc - coeff * x`, wrapping on overflow.
#[inline(always)]
pub fn mul_sub(acc: i64, coeff: i32, x: i64) -> i64 {
    acc.wrapping_sub((coeff as i64).wrapping_mul(x))
}

/// Convert a normalized sample (full scale = ±1.0) to `i32`, saturating.
#[inline(always)]
pub fn to_full_scale(value: f32) -> i32 {
    (value as f64 * 2_147_483_648.0) as i32
}
