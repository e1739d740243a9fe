//! Quadrature recurrence sine generator.
//!
//! Two state variables rotate by a fixed angle per sample (`yq -= e*y;
//! y += e*yq`), which costs two multiplies and no table. The recurrence
//! is marginally stable, so its amplitude drifts slightly from the ideal;
//! the generator tracks the running positive peak and scales the output by
//! its inverse, keeping the level exact after the first half period.

use crate::constants::OUTPUT_LEVEL_SCALE;

use super::fixed::to_full_scale;

/// Per-configuration oscillator constants.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OscillatorParameters {
    /// Rotation coefficient `2 * sin(pi * f / fs)`.
    pub e: f32,
    /// Output amplitude as a fraction of full scale.
    pub level: f32,
}

impl OscillatorParameters {
    /// Parameters for `frequency` Hz at `level_dbu` dBu, sampled at `sample_rate` Hz.
    pub fn new(frequency: f32, level_dbu: f32, sample_rate: f32) -> Self {
        let half_angle = 2.0 * core::f32::consts::PI * frequency / sample_rate / 2.0;
        let level_scale = libm::powf(10.0, level_dbu * 0.05);
        OscillatorParameters {
            e: 2.0 * libm::sinf(half_angle),
            level: level_scale * OUTPUT_LEVEL_SCALE,
        }
    }
}

/// Running state of the recurrence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorState {
    y: f32,
    yq: f32,
    max_level: f32,
    max_level_inv: f32,
}

impl OscillatorState {
    pub const fn new() -> Self {
        OscillatorState {
            y: 0.0,
            yq: 1.0,
            max_level: 0.5,
            max_level_inv: 2.0,
        }
    }

    /// Restart at phase zero with the peak estimate forgotten.
    pub fn reset(&mut self) {
        *self = OscillatorState::new();
    }

    /// Advance one sample and return it at full `i32` scale.
    #[inline]
    pub fn next(&mut self, params: &OscillatorParameters) -> i32 {
        self.yq -= params.e * self.y;
        self.y += params.e * self.yq;

        if self.y > self.max_level {
            self.max_level = self.y;
            self.max_level_inv = 1.0 / self.y;
        }

        to_full_scale(self.y * params.level * self.max_level_inv)
    }
}

impl Default for OscillatorState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_follows_dbu() {
        let zero = OscillatorParameters::new(1000.0, 0.0, 48_000.0);
        let plus20 = OscillatorParameters::new(1000.0, 20.0, 48_000.0);
        assert!((plus20.level / zero.level - 10.0).abs() < 1e-4);
        assert!((zero.level - OUTPUT_LEVEL_SCALE).abs() < 1e-7);
    }

    #[test]
    fn rotation_coefficient() {
        let p = OscillatorParameters::new(12_000.0, 0.0, 48_000.0);
        // 2 * sin(pi / 4)
        assert!((p.e - core::f32::consts::SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn peak_matches_target_level() {
        let params = OscillatorParameters::new(1000.0, 4.0, 48_000.0);
        let mut state = OscillatorState::new();
        let target = params.level as f64 * 2_147_483_648.0;

        let mut max = i32::MIN;
        let mut min = i32::MAX;
        for _ in 0..500 {
            let s = state.next(&params);
            max = max.max(s);
            min = min.min(s);
        }
        assert!((max as f64 / target - 1.0).abs() < 0.01, "max {} target {}", max, target);
        assert!((min as f64 / target + 1.0).abs() < 0.01, "min {} target {}", min, target);
    }

    #[test]
    fn zero_crossings_match_frequency() {
        let params = OscillatorParameters::new(1000.0, 0.0, 48_000.0);
        let mut state = OscillatorState::new();
        let mut prev = 0;
        let mut rising = 0;
        for _ in 0..48_000 {
            let s = state.next(&params);
            if prev < 0 && s >= 0 {
                rising += 1;
            }
            prev = s;
        }
        assert!((999..=1001).contains(&rising), "rising edges {}", rising);
    }

    #[test]
    fn reset_restarts_phase() {
        let params = OscillatorParameters::new(440.0, 0.0, 48_000.0);
        let mut state = OscillatorState::new();
        let first = state.next(&params);
        for _ in 0..1234 {
            state.next(&params);
        }
        state.reset();
        assert_eq!(state.next(&params), first);
    }
}
