//! Scoped analysis session.

use super::AnalysisCoordinator;
use crate::analyzer::DistortionResult;

/// An open analysis request. Finishes the request when dropped.
///
/// ```ignore
/// let session = coordinator.session();
/// session.read(yield_now);
/// let result = session.result();
/// ```
pub struct AnalysisSession<'c, 'a> {
    coordinator: &'c AnalysisCoordinator<'a>,
}

impl<'c, 'a> AnalysisSession<'c, 'a> {
    pub(super) fn new(coordinator: &'c AnalysisCoordinator<'a>) -> Self {
        coordinator.analysis_start();
        AnalysisSession { coordinator }
    }

    /// Wait for the result, calling `idle` between checks.
    pub fn read(&self, idle: impl FnMut()) {
        self.coordinator.analysis_read(idle);
    }

    #[cfg(feature = "std")]
    pub fn read_timeout(&self, timeout: std::time::Duration) -> crate::error::Result<()> {
        self.coordinator.analysis_read_timeout(timeout)
    }

    pub fn is_available(&self) -> bool {
        self.coordinator.analysis_available()
    }

    pub fn result(&self) -> DistortionResult {
        self.coordinator.result()
    }
}

impl Drop for AnalysisSession<'_, '_> {
    fn drop(&mut self) {
        // Cannot be unbalanced: the session started the request itself
        let _ = self.coordinator.analysis_finish();
    }
}
