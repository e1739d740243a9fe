//! Crate error type.

use thiserror::Error;

/// Errors returned by the non-interrupt parts of the analyzer core.
///
/// The per-sample path never fails; these come from the analyzer, the
/// coordinator and the optional timeouts on hosted targets.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum Error {
    #[error("invalid target frequency {0} Hz (must be finite and positive)")]
    InvalidFrequency(f32),

    #[error("no analysis window captured")]
    NotReady,

    #[error("requested {requested} samples but only {available} are buffered")]
    InsufficientData { requested: usize, available: usize },

    #[error("invalid transform length {0} (must be a power of two within the buffers)")]
    InvalidLength(usize),

    #[error("analysis finish without a matching start")]
    UnbalancedFinish,

    #[error("peer did not respond before the deadline")]
    Timeout,
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
