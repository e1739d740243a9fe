//! # thd-analyzer
//!
//! Real-time core of a dual-core THD analyzer, `no_std` and allocation
//! free. One core generates a test tone and captures the device under test
//! through a per-sample interrupt; the other sequences configuration
//! changes and analysis requests for its local clients. The two talk only
//! through a fixed block of shared memory.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Shared memory | [`ipc`] | Mailboxes, published slots, [`SharedRegion`](ipc::SharedRegion) layout |
//! | History | [`ring`] | Sample ring written by the interrupt, snapshotted by the analyzer |
//! | DSP | [`dsp`] | Notch filter, recurrence oscillator, FFT, window tables |
//! | Interrupt | [`chain`] | Per-sample [`DspChain`](chain::DspChain) and its timing budget |
//! | Analysis | [`analyzer`] | [`SpectralAnalyzer`](analyzer::SpectralAnalyzer) and the DSP-side command loop |
//! | Control | [`coordinator`] | Controller-side [`AnalysisCoordinator`](coordinator::AnalysisCoordinator) and sessions |
//! | Diagnostics | [`tap`] | Stream dump over the published ring positions |
//!
//! ## Wiring
//!
//! ```ignore
//! use thd_analyzer::prelude::*;
//!
//! // DSP core
//! let region = unsafe { SharedRegion::init_at(SHARED_MEMORY_BASE) };
//! let chain_params = Mailbox::new();
//! // `INPUT_RING_LEN` samples of external SDRAM
//! let sdram_ring: &'static mut [i32] = unsafe { core::slice::from_raw_parts_mut(SDRAM_BASE as *mut i32, INPUT_RING_LEN) };
//! let ring = SharedRing::new(RingBuffer::new(sdram_ring));
//! let mut chain = DspChain::new(&chain_params, &ring, region, ChainParameters::new(&GeneratorParameters::default(), rate));
//! let mut service = AnalyzerService::new(region, &chain_params, &ring, irq, SpectralAnalyzer::new(buffers, rate)?, rate);
//! let mut monitor = DeadlineMonitor::for_rate(CORE_CLOCK_HZ, rate);
//!
//! // In the I2S interrupt:
//! let frame = chain.tick_timed(&cycle_counter, &mut monitor, inputs);
//! // In the idle loop:
//! service.poll()?;
//! monitor.report();
//!
//! // Controller core
//! let coordinator = AnalysisCoordinator::new(unsafe { SharedRegion::at(SHARED_MEMORY_BASE) });
//! coordinator.set_configuration(GeneratorParameters::oscillator(1000.0, 4.0, true));
//! let session = coordinator.session();
//! session.read(yield_now);
//! let result = session.result();
//!
//! // Stream dump, from any context
//! let mut tap = StreamTap::new(region);
//! let n = tap.poll(&ring, &mut dump);
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `std` | no | Timeouts on mailbox writes and analysis reads, `std::error::Error` |
//! | `serde` | no | `Serialize`/`Deserialize` on the configuration and result types |
//!
//! ## Audio parameters
//!
//! - **Sample rate:** 48 kHz by default ([`config::SampleRate`])
//! - **Sample format:** `i32`, four input channels, two output legs
//! - **Largest FFT:** 65536 points ([`constants::MAX_FFT_SIZE`])

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod analyzer;
pub mod chain;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod dsp;
pub mod error;
pub mod ipc;
pub mod ring;
pub mod tap;

#[cfg(test)]
mod integration_tests;

pub use error::{Error, Result};

/// The types needed to wire up both cores.
pub mod prelude {
    pub use crate::analyzer::{AnalysisMode, AnalyzerBuffers, AnalyzerService, DistortionResult, SpectralAnalyzer};
    pub use crate::chain::{ChainParameters, DeadlineMonitor, DspChain, OutputFrame, SampleClock};
    pub use crate::config::SampleRate;
    pub use crate::constants::{INPUT_RING_LEN, SHARED_MEMORY_BASE};
    pub use crate::coordinator::{AnalysisCoordinator, AnalysisSession};
    pub use crate::ipc::{GeneratorParameters, Mailbox, OperationMode, SharedRegion};
    pub use crate::ring::{IrqMask, RingBuffer, SharedRing};
    pub use crate::tap::StreamTap;
}
