//! DSP-side command loop.
//!
//! Runs in the idle loop of the DSP core and answers the controller over
//! the [`SharedRegion`]:
//!
//! - **Configuration**: new [`GeneratorParameters`] are turned into
//!   [`ChainParameters`] and handed to the interrupt, the captured window
//!   is dropped, and the controller gets an ack.
//! - **Block**: capture and analyze a window at the configured frequency,
//!   publish the result in the distortion slots, ack, then hold.
//! - **Done**: release the held window and ack.

use crate::chain::ChainParameters;
use crate::config::SampleRate;
use crate::constants::LEVEL_FLOOR_DB;
use crate::error::Result;
use crate::ipc::{CommandType, GeneratorParameters, Mailbox, SharedRegion};
use crate::ring::{IrqMask, SharedRing};

use super::{AnalysisMode, DistortionResult, SpectralAnalyzer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// No analysis requested.
    Idle,
    /// Block received; waiting for enough history.
    Capturing,
    /// Result published and acked; waiting for Done.
    Holding,
}

/// Drives a [`SpectralAnalyzer`] from the shared command mailboxes.
pub struct AnalyzerService<'a, B, M> {
    region: &'a SharedRegion,
    chain: &'a Mailbox<ChainParameters>,
    ring: &'a SharedRing<B>,
    irq: M,
    analyzer: SpectralAnalyzer<'a>,
    rate: SampleRate,
    settings: GeneratorParameters,
    state: ServiceState,
}

impl<'a, B, M> AnalyzerService<'a, B, M>
where
    B: AsRef<[i32]> + AsMut<[i32]>,
    M: IrqMask,
{
    /// Create a service assuming the interrupt runs the power-on
    /// configuration ([`GeneratorParameters::default()`]).
    pub fn new(
        region: &'a SharedRegion,
        chain: &'a Mailbox<ChainParameters>,
        ring: &'a SharedRing<B>,
        irq: M,
        analyzer: SpectralAnalyzer<'a>,
        rate: SampleRate,
    ) -> Self {
        AnalyzerService {
            region,
            chain,
            ring,
            irq,
            analyzer,
            rate,
            settings: GeneratorParameters::default(),
            state: ServiceState::Idle,
        }
    }

    /// Handle pending commands and advance any requested analysis.
    ///
    /// Returns the result on the poll that publishes it. An analysis that
    /// cannot run (for example a non-positive target frequency) publishes
    /// the floor level, acks so the controller does not stall, and returns
    /// the error.
    pub fn poll(&mut self) -> Result<Option<DistortionResult>> {
        // Leave new settings in the shared mailbox until the interrupt has
        // taken the previous ones
        if self.chain.can_write() {
            if let Some(params) = self.region.generator.read() {
                self.configure(params);
            }
        }

        if let Some(command) = self.region.analysis.read() {
            match command.command_type {
                CommandType::Block => {
                    log::debug!("analysis block requested");
                    self.state = ServiceState::Capturing;
                }
                CommandType::Done => {
                    log::debug!("analysis released");
                    self.analyzer.finish();
                    self.state = ServiceState::Idle;
                    self.region.analysis_ack.write(true);
                }
            }
        }

        // New parameters are applied (and the ring cleared) on the next sample
        if self.state != ServiceState::Capturing || !self.chain.can_write() {
            return Ok(None);
        }

        match self.analyze() {
            Ok(Some(result)) => {
                self.publish(result);
                Ok(Some(result))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                log::warn!("analysis failed: {}", e);
                self.publish(DistortionResult {
                    frequency: 0.0,
                    level: LEVEL_FLOOR_DB,
                });
                Err(e)
            }
        }
    }

    fn configure(&mut self, params: GeneratorParameters) {
        log::info!(
            "generator: {:?} {} Hz {} dBu balanced={}",
            params.operation_mode,
            params.frequency,
            params.level,
            params.balanced_io
        );
        self.chain.write(ChainParameters::new(&params, self.rate));
        self.settings = params;
        self.analyzer.refresh();
        self.region.generator_ack.write(true);
    }

    fn analyze(&mut self) -> Result<Option<DistortionResult>> {
        let frequency = self.settings.frequency;
        if !self.analyzer.update(self.ring, &self.irq, frequency)? {
            return Ok(None);
        }
        let mode = AnalysisMode::from(self.settings.operation_mode);
        self.analyzer.process(frequency, mode).map(Some)
    }

    fn publish(&mut self, result: DistortionResult) {
        self.region.distortion_level.store(result.level);
        self.region.distortion_frequency.store(result.frequency);
        self.state = ServiceState::Holding;
        self.region.analysis_ack.write(true);
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Generator settings last received from the controller.
    pub fn settings(&self) -> &GeneratorParameters {
        &self.settings
    }

    pub fn analyzer(&self) -> &SpectralAnalyzer<'a> {
        &self.analyzer
    }
}
