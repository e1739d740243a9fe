//! Interrupt timing budget.
//!
//! The chain must finish well inside one sample period or the codec FIFO
//! underruns. On target, [`SampleClock`] is the Cortex-M cycle counter
//! (`DWT.CYCCNT`); tests drive it by hand.

use crate::config::SampleRate;

/// Free-running, wrapping tick counter.
pub trait SampleClock {
    fn now(&self) -> u32;
}

/// Records how long each interrupt took against a fixed budget.
///
/// `record()` is cheap enough for the interrupt itself; `report()` logs
/// and belongs in the idle loop.
#[derive(Debug, Clone)]
pub struct DeadlineMonitor {
    budget: u32,
    ticks: u32,
    overruns: u32,
    worst: u32,
}

impl DeadlineMonitor {
    /// Monitor with a budget of `budget` clock ticks per sample.
    pub const fn new(budget: u32) -> Self {
        DeadlineMonitor {
            budget,
            ticks: 0,
            overruns: 0,
            worst: 0,
        }
    }

    /// Budget of one sample period for a clock running at `clock_hz`.
    pub const fn for_rate(clock_hz: u32, rate: SampleRate) -> Self {
        Self::new(clock_hz / rate.hz())
    }

    /// Budget of one sample period for a clock counting nanoseconds.
    pub const fn nanoseconds(rate: SampleRate) -> Self {
        Self::new(rate.period_ns())
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Record one interrupt that took `elapsed` clock ticks.
    #[inline]
    pub fn record(&mut self, elapsed: u32) {
        self.ticks = self.ticks.wrapping_add(1);
        if elapsed > self.worst {
            self.worst = elapsed;
        }
        if elapsed > self.budget {
            self.overruns = self.overruns.saturating_add(1);
        }
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Longest interrupt seen so far, in clock ticks.
    pub fn worst(&self) -> u32 {
        self.worst
    }

    /// Log a warning if any interrupt overran. Returns `true` if one did.
    ///
    /// Not for interrupt context.
    pub fn report(&self) -> bool {
        if self.overruns == 0 {
            log::trace!("chain timing: worst {} of {} ticks", self.worst, self.budget);
            return false;
        }
        log::warn!(
            "chain overran its budget {} times in {} samples (worst {} ticks, budget {})",
            self.overruns,
            self.ticks,
            self.worst,
            self.budget
        );
        true
    }

    /// Forget everything recorded so far.
    pub fn reset(&mut self) {
        *self = Self::new(self.budget);
    }
}
