/// Default codec sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Base address of the inter-core shared RAM block holding the [`SharedRegion`](crate::ipc::SharedRegion).
pub const SHARED_MEMORY_BASE: usize = 0x2000_C010;

/// log2 of the largest FFT the analyzer will run.
pub const MAX_FFT_SIZE_LOG2: u32 = 16;

/// Largest FFT size (65536 points).
pub const MAX_FFT_SIZE: usize = 1 << MAX_FFT_SIZE_LOG2;

/// Smallest FFT size with a window table.
pub const MIN_FFT_SIZE: usize = 16;

/// Smallest analysis window in sample pairs, regardless of frequency.
pub const MIN_ANALYSIS_LEN: usize = 1024;

/// Minimum settling margin in sample pairs on top of the analysis window.
pub const MIN_EXTRA_LEN: usize = 200;

/// Periods of the fundamental required in the analysis window.
pub const ANALYSIS_PERIODS: f32 = 11.0;

/// Periods of the fundamental allowed for filter settling.
pub const SETTLING_PERIODS: f32 = 4.0;

/// Samples dropped from the ring at a time once it is half full.
pub const RING_ADVANCE_STEP: usize = 16;

/// Default ring length on target: 14 MiB of SDRAM as `i32` samples.
pub const INPUT_RING_LEN: usize = (14 * 1_048_576) / 4;

/// Band-reject Q of each biquad section.
pub const FILTER_Q: f32 = 2.8;

/// Number of cascaded biquad sections.
pub const FILTER_SECTIONS: usize = 4;

/// Coefficient scale of the fixed-point biquad (2^25).
pub const FILTER_COEFF_SHIFT: u32 = 25;

/// Headroom shift applied to filter input and removed from its output.
pub const FILTER_INPUT_SHIFT: u32 = 5;

/// dBu to output-scale conversion: `0.5 * 2.19089023 / 25.6`.
pub const OUTPUT_LEVEL_SCALE: f32 = 0.5 * 2.190_890_23 / 25.6;

/// FFT magnitude to 0 dBu scale, divided by the FFT size at use.
pub const MAGNITUDE_SCALE_0DBU: f32 = 2.430_892_3e-8;

/// Reported level when the peak magnitude is zero.
pub const LEVEL_FLOOR_DB: f32 = -144.4;

/// Bins around the fundamental excluded (distortion) or included (frequency counter).
pub const FUNDAMENTAL_EXCLUSION_BINS: i32 = 10;

/// Highest harmonic searched, as a multiple of the fundamental.
pub const MAX_HARMONIC: f32 = 34.0;

/// Guard band below the sample rate for the search upper bound, in Hz.
pub const NYQUIST_GUARD_HZ: f32 = 3000.0;
