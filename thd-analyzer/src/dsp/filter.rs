//! Fixed-point band-reject biquad.
//!
//! One section is a bilinear-transform notch at the generator frequency
//! (Q = 2.8) with coefficients scaled by 2^25. Four sections in cascade
//! remove the fundamental so that the analyzer sees mostly harmonics and
//! noise. Input is pre-shifted by 5 bits for headroom, products accumulate
//! in 64 bits, and the result is descaled with arithmetic right shifts.

use crate::constants::{FILTER_COEFF_SHIFT, FILTER_INPUT_SHIFT, FILTER_Q, FILTER_SECTIONS};

use super::fixed::{mul_acc, mul_sub, quantize};

/// Biquad coefficients, scaled by 2^25 and normalized by `a0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterParameters {
    pub a1: i32,
    pub a2: i32,
    pub b0: i32,
    pub b1: i32,
    pub b2: i32,
}

impl FilterParameters {
    /// Design a notch at `normalized` = frequency / sample rate.
    pub fn band_reject(normalized: f32) -> Self {
        let w0 = (2.0 * core::f64::consts::PI * normalized as f64) as f32;
        let sin_w0 = libm::sinf(w0);
        let cos_w0 = libm::cosf(w0);
        let alpha = (sin_w0 as f64 / (2.0 * FILTER_Q as f64)) as f32;

        let b0 = 1.0f32;
        let b1 = -2.0 * cos_w0;
        let b2 = 1.0f32;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        let scaling = (1u32 << FILTER_COEFF_SHIFT) as f32 / a0;

        FilterParameters {
            a1: quantize(a1, scaling),
            a2: quantize(a2, scaling),
            b0: quantize(b0, scaling),
            b1: quantize(b1, scaling),
            b2: quantize(b2, scaling),
        }
    }
}

/// Delay registers of one section, kept at the pre-shifted scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterState {
    x1: i64,
    x2: i64,
    y1: i64,
    y2: i64,
}

impl FilterState {
    pub const fn new() -> Self {
        FilterState {
            x1: 0,
            x2: 0,
            y1: 0,
            y2: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = FilterState::new();
    }
}

/// Run one sample through one section.
#[inline]
pub fn filter(input: i32, state: &mut FilterState, params: &FilterParameters) -> i32 {
    let scaled_in = (input as i64) << FILTER_INPUT_SHIFT;

    let mut out = mul_acc(0, params.b0, scaled_in);
    out = mul_acc(out, params.b1, state.x1);
    out = mul_acc(out, params.b2, state.x2);
    out = mul_sub(out, params.a1, state.y1);
    out = mul_sub(out, params.a2, state.y2);
    out >>= FILTER_COEFF_SHIFT;

    state.x2 = state.x1;
    state.x1 = scaled_in;
    state.y2 = state.y1;
    state.y1 = out;

    (out >> FILTER_INPUT_SHIFT) as i32
}

/// Four identical sections in series.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterCascade {
    sections: [FilterState; FILTER_SECTIONS],
}

impl FilterCascade {
    pub const fn new() -> Self {
        FilterCascade {
            sections: [FilterState::new(); FILTER_SECTIONS],
        }
    }

    /// Filter one sample through every section.
    #[inline]
    pub fn process(&mut self, input: i32, params: &FilterParameters) -> i32 {
        self.sections
            .iter_mut()
            .fold(input, |x, state| filter(x, state, params))
    }

    /// Clear every delay register.
    pub fn reset(&mut self) {
        for state in self.sections.iter_mut() {
            state.reset();
        }
    }
}
