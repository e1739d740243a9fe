//! Controller-side sequencing of configuration uploads and analysis requests.
//!
//! Local clients (web handlers, the front panel) never talk to the DSP core
//! directly. They stage a configuration or open an analysis session, and a
//! periodic task calls [`AnalysisCoordinator::update()`] to move two
//! independent state machines forward:
//!
//! ```text
//! configuration:  Idle --staged--> Upload --command taken, ack--> Idle
//!
//! analysis:       Idle --count > 0, Block--> Running --ack--> Processing
//!                   ^                                              |
//!                   +----ack---- Releasing <----complete, Done-----+
//! ```
//!
//! Analysis requests are reference counted: overlapping sessions share one
//! Block/Done round trip.

pub mod session;

pub use session::AnalysisSession;

use spin::Mutex;

use crate::analyzer::DistortionResult;
use crate::error::{Error, Result};
use crate::ipc::{AnalysisCommand, BinarySemaphore, GeneratorParameters, SharedRegion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationState {
    Idle,
    /// Parameters sent; waiting for the DSP core to take them and ack.
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Idle,
    /// Block sent; waiting for the result ack.
    Running,
    /// Result published; readers may proceed.
    Processing,
    /// Done sent; waiting for the release ack.
    Releasing,
}

struct Inner {
    configuration: ConfigurationState,
    analysis: AnalysisState,
    staged: Option<GeneratorParameters>,
    sessions: u32,
    complete: bool,
}

/// Controller-side state machine for one DSP core.
pub struct AnalysisCoordinator<'a> {
    region: &'a SharedRegion,
    inner: Mutex<Inner>,
    ready: BinarySemaphore,
}

impl<'a> AnalysisCoordinator<'a> {
    pub const fn new(region: &'a SharedRegion) -> Self {
        AnalysisCoordinator {
            region,
            inner: Mutex::new(Inner {
                configuration: ConfigurationState::Idle,
                analysis: AnalysisState::Idle,
                staged: None,
                sessions: 0,
                complete: false,
            }),
            ready: BinarySemaphore::new(),
        }
    }

    /// Stage `params` for upload on the next [`update()`](Self::update).
    ///
    /// Staging again before the upload starts replaces the staged value.
    pub fn set_configuration(&self, params: GeneratorParameters) {
        log::info!("staging configuration: {} Hz {} dBu", params.frequency, params.level);
        self.inner.lock().staged = Some(params);
    }

    /// Advance both state machines until neither changes.
    ///
    /// Never spins on a mailbox: a send that would block is retried on the
    /// next call.
    pub fn update(&self) {
        let mut inner = self.inner.lock();
        loop {
            let configuration = self.step_configuration(&mut inner);
            let analysis = self.step_analysis(&mut inner);
            if !configuration && !analysis {
                break;
            }
        }
    }

    fn step_configuration(&self, inner: &mut Inner) -> bool {
        let next = match inner.configuration {
            ConfigurationState::Idle => {
                let Some(params) = inner.staged.take() else {
                    return false;
                };
                if let Err(params) = self.region.generator.try_write(params) {
                    inner.staged = Some(params);
                    return false;
                }
                ConfigurationState::Upload
            }
            ConfigurationState::Upload => {
                if !self.region.generator.can_write() || self.region.generator_ack.read().is_none() {
                    return false;
                }
                ConfigurationState::Idle
            }
        };
        log::trace!("configuration {:?} -> {:?}", inner.configuration, next);
        inner.configuration = next;
        true
    }

    fn step_analysis(&self, inner: &mut Inner) -> bool {
        let next = match inner.analysis {
            AnalysisState::Idle => {
                if inner.sessions == 0 || self.region.analysis.try_write(AnalysisCommand::BLOCK).is_err() {
                    return false;
                }
                AnalysisState::Running
            }
            AnalysisState::Running => {
                if self.region.analysis_ack.read().is_none() {
                    return false;
                }
                self.ready.give();
                AnalysisState::Processing
            }
            AnalysisState::Processing => {
                if !inner.complete || self.region.analysis.try_write(AnalysisCommand::DONE).is_err() {
                    return false;
                }
                inner.complete = false;
                // Readers of this cycle are gone; the permit must not leak into the next
                self.ready.try_take();
                AnalysisState::Releasing
            }
            AnalysisState::Releasing => {
                if self.region.analysis_ack.read().is_none() {
                    return false;
                }
                AnalysisState::Idle
            }
        };
        log::debug!("analysis {:?} -> {:?}", inner.analysis, next);
        inner.analysis = next;
        true
    }

    /// Register interest in an analysis result.
    pub fn analysis_start(&self) {
        let mut inner = self.inner.lock();
        inner.sessions += 1;
        log::trace!("analysis start, {} session(s)", inner.sessions);
    }

    /// `true` if a result is published and not yet released.
    pub fn analysis_available(&self) -> bool {
        let inner = self.inner.lock();
        inner.sessions > 0 && inner.analysis == AnalysisState::Processing && !inner.complete
    }

    /// Wait for the current result, calling `idle` between checks.
    ///
    /// Must be paired with a preceding [`analysis_start()`](Self::analysis_start).
    pub fn analysis_read(&self, idle: impl FnMut()) {
        self.ready.take(idle);
        self.ready.give();
    }

    /// Like [`analysis_read()`](Self::analysis_read), but gives up after `timeout`.
    #[cfg(feature = "std")]
    pub fn analysis_read_timeout(&self, timeout: std::time::Duration) -> Result<()> {
        if let Err(e) = self.ready.take_timeout(timeout) {
            log::warn!("analysis result not ready after {:?}", timeout);
            return Err(e);
        }
        self.ready.give();
        Ok(())
    }

    /// Drop interest in the analysis result.
    ///
    /// The last finish releases the analyzer.
    pub fn analysis_finish(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.sessions == 0 {
            log::warn!("analysis finish without a matching start");
            return Err(Error::UnbalancedFinish);
        }
        inner.sessions -= 1;
        if inner.sessions == 0 {
            self.ready.try_take();
            if matches!(inner.analysis, AnalysisState::Running | AnalysisState::Processing) {
                inner.complete = true;
            }
        }
        Ok(())
    }

    /// Start an analysis session that finishes when dropped.
    pub fn session(&self) -> AnalysisSession<'_, 'a> {
        AnalysisSession::new(self)
    }

    /// The result last published by the DSP core.
    ///
    /// Only meaningful after [`analysis_read()`](Self::analysis_read) returned.
    pub fn result(&self) -> DistortionResult {
        DistortionResult {
            frequency: self.region.distortion_frequency.load(),
            level: self.region.distortion_level.load(),
        }
    }

    pub fn state(&self) -> (ConfigurationState, AnalysisState) {
        let inner = self.inner.lock();
        (inner.configuration, inner.analysis)
    }
}
