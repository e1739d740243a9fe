//! Per-sample signal chain run from the codec interrupt.
//!
//! Every sample period the chain:
//!
//! 1. averages the four input channels;
//! 2. picks up new [`ChainParameters`] from its mailbox, resetting the
//!    oscillator, the filters and the ring history if there are any;
//! 3. notches the fundamental out with the [`FilterCascade`];
//! 4. appends the raw and filtered samples to the ring, dropping old
//!    history once the ring is half full;
//! 5. publishes the ring positions for the stream tap;
//! 6. produces the next output sample.
//!
//! Nothing here allocates, blocks, logs or fails. The frame returned by
//! [`DspChain::tick()`] goes out on the following sample period.

pub mod timing;

pub use timing::{DeadlineMonitor, SampleClock};

use crate::config::SampleRate;
use crate::constants::RING_ADVANCE_STEP;
use crate::dsp::filter::{FilterCascade, FilterParameters};
use crate::dsp::fixed::to_full_scale;
use crate::dsp::oscillator::{OscillatorParameters, OscillatorState};
use crate::ipc::{GeneratorParameters, Mailbox, OperationMode, SharedRegion};
use crate::ring::SharedRing;

/// Everything the interrupt needs for one generator configuration.
///
/// Computed outside the interrupt (trigonometry and `powf` are too slow
/// for a sample period) and handed over through a local [`Mailbox`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainParameters {
    pub oscillator: OscillatorParameters,
    pub filter: FilterParameters,
    pub balanced_io: bool,
    pub mode: OperationMode,
    /// Positive output in DC mode, full-scale `i32`.
    pub dc_positive: i32,
    /// Negative output in DC mode, full-scale `i32`.
    pub dc_negative: i32,
}

impl ChainParameters {
    pub fn new(params: &GeneratorParameters, rate: SampleRate) -> Self {
        let fs = rate.as_f32();
        ChainParameters {
            oscillator: OscillatorParameters::new(params.frequency, params.level, fs),
            filter: FilterParameters::band_reject(params.frequency / fs),
            balanced_io: params.balanced_io,
            mode: params.operation_mode,
            dc_positive: to_full_scale(params.cv0.clamp(-1.0, 1.0)),
            dc_negative: to_full_scale(params.cv1.clamp(-1.0, 1.0)),
        }
    }
}

/// One output sample for both legs of the differential output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputFrame {
    pub positive: i32,
    pub negative: i32,
}

/// The interrupt-side signal chain.
pub struct DspChain<'a, B> {
    parameters: &'a Mailbox<ChainParameters>,
    ring: &'a SharedRing<B>,
    region: &'a SharedRegion,
    current: ChainParameters,
    oscillator: OscillatorState,
    cascade: FilterCascade,
}

impl<'a, B: AsRef<[i32]> + AsMut<[i32]>> DspChain<'a, B> {
    /// Create a chain running `initial` until the first mailbox update.
    pub fn new(
        parameters: &'a Mailbox<ChainParameters>,
        ring: &'a SharedRing<B>,
        region: &'a SharedRegion,
        initial: ChainParameters,
    ) -> Self {
        DspChain {
            parameters,
            ring,
            region,
            current: initial,
            oscillator: OscillatorState::new(),
            cascade: FilterCascade::new(),
        }
    }

    /// Parameters currently in effect.
    pub fn parameters(&self) -> &ChainParameters {
        &self.current
    }

    /// Process one input frame (four codec channels) and return the next output frame.
    pub fn tick(&mut self, input: [i32; 4]) -> OutputFrame {
        // Each channel is pre-shifted so the sum of four cannot overflow
        let average: i32 = input.iter().map(|&x| x >> 2).sum();

        let ring = self.ring;
        let (oldest, latest) = ring.produce(|ring| {
            // Swapping parameters and clearing history under the ring lock
            // keeps any snapshot from mixing two configurations.
            if let Some(p) = self.parameters.read() {
                self.current = p;
                self.oscillator.reset();
                self.cascade.reset();
                ring.clear();
            }

            let filtered = self.cascade.process(average, &self.current.filter);
            ring.insert(average);
            ring.insert(filtered);
            if ring.used() >= ring.capacity() / 2 + RING_ADVANCE_STEP {
                ring.advance(RING_ADVANCE_STEP);
            }
            (ring.oldest_position(), ring.latest_position())
        });
        self.region.oldest.store(oldest);
        self.region.latest.store(latest);

        self.generate()
    }

    /// [`tick()`](Self::tick), measuring the time spent against `monitor`'s budget.
    pub fn tick_timed<C: SampleClock>(
        &mut self,
        clock: &C,
        monitor: &mut DeadlineMonitor,
        input: [i32; 4],
    ) -> OutputFrame {
        let start = clock.now();
        let frame = self.tick(input);
        monitor.record(clock.now().wrapping_sub(start));
        frame
    }

    fn generate(&mut self) -> OutputFrame {
        match self.current.mode {
            OperationMode::DcControl => OutputFrame {
                positive: self.current.dc_positive,
                negative: self.current.dc_negative,
            },
            OperationMode::Oscillator | OperationMode::FrequencyAnalysis => {
                let positive = self.oscillator.next(&self.current.oscillator);
                let negative = if self.current.balanced_io {
                    positive.saturating_neg()
                } else {
                    0
                };
                OutputFrame { positive, negative }
            }
        }
    }
}
