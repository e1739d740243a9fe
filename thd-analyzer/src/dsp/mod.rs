//! Signal processing building blocks.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`fixed`] | Fixed-point quantization and accumulation |
//! | [`filter`] | Band-reject biquad and its four-section cascade |
//! | [`oscillator`] | Self-normalizing recurrence sine generator |
//! | [`fft`] | Radix-2 complex FFT and inverse |
//! | [`window`] | Flat-top window tables |

pub mod fft;
pub mod filter;
pub mod fixed;
pub mod oscillator;
pub mod window;

pub use fft::{fft, inverse_fft};
pub use filter::{FilterCascade, FilterParameters, FilterState};
pub use oscillator::{OscillatorParameters, OscillatorState};
pub use window::WindowTable;
