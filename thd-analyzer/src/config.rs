//! Runtime configuration that is not carried in [`GeneratorParameters`](crate::ipc::GeneratorParameters).

use crate::constants::DEFAULT_SAMPLE_RATE;

/// Codec sample rate.
///
/// Fixed at startup; every frequency-to-bin and frequency-to-coefficient
/// conversion uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleRate {
    #[default]
    Hz48000,
    Hz96000,
    Hz192000,
}

impl SampleRate {
    /// Rate in Hz.
    pub const fn hz(self) -> u32 {
        match self {
            SampleRate::Hz48000 => DEFAULT_SAMPLE_RATE,
            SampleRate::Hz96000 => 96_000,
            SampleRate::Hz192000 => 192_000,
        }
    }

    pub const fn as_f32(self) -> f32 {
        self.hz() as f32
    }

    /// Length of one sample period in nanoseconds.
    pub const fn period_ns(self) -> u32 {
        1_000_000_000 / self.hz()
    }
}
