//! Shared-memory layout and wire types exchanged between the two cores.
//!
//! All mailboxes and slots live in one `#[repr(C)]` block. Each entry
//! starts at the previous entry's end rounded up to its own alignment, so
//! both firmware images agree on the layout without exchanging addresses.
//!
//! | Order | Entry | Payload | Direction |
//! |-------|-------|---------|-----------|
//! | 1 | `generator` | [`GeneratorParameters`] | controller → DSP |
//! | 2 | `generator_ack` | `bool` | DSP → controller |
//! | 3 | `analysis` | [`AnalysisCommand`] | controller → DSP |
//! | 4 | `analysis_ack` | `bool` | DSP → controller |
//! | 5 | `oldest` | ring position | DSP → anyone |
//! | 6 | `latest` | ring position | DSP → anyone |
//! | 7 | `distortion_level` | dB | DSP → anyone |
//! | 8 | `distortion_frequency` | Hz | DSP → anyone |

use super::mailbox::Mailbox;
use super::slot::PublishedSlot;

/// What the generator core should do with its outputs.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperationMode {
    /// Sine output; distortion analysis of the notched input.
    #[default]
    Oscillator = 0,
    /// Sine output; frequency counting on the raw input.
    FrequencyAnalysis = 1,
    /// Two fixed DC levels for calibration.
    DcControl = 2,
}

/// Generator configuration sent from the controller core.
///
/// Wire layout: `{ f32, f32, bool, i32, f32, f32 }` with C padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneratorParameters {
    /// Output frequency in Hz.
    pub frequency: f32,
    /// Output level in dBu.
    pub level: f32,
    /// Drive the negative output leg with the inverted signal.
    pub balanced_io: bool,
    pub operation_mode: OperationMode,
    /// DC level of the positive output in [`OperationMode::DcControl`], -1.0..=1.0 of full scale.
    pub cv0: f32,
    /// DC level of the negative output in [`OperationMode::DcControl`], -1.0..=1.0 of full scale.
    pub cv1: f32,
}

impl GeneratorParameters {
    /// Oscillator configuration at `frequency` Hz and `level` dBu.
    pub const fn oscillator(frequency: f32, level: f32, balanced_io: bool) -> Self {
        GeneratorParameters {
            frequency,
            level,
            balanced_io,
            operation_mode: OperationMode::Oscillator,
            cv0: 0.0,
            cv1: 0.0,
        }
    }

    /// DC calibration configuration.
    pub const fn dc(cv0: f32, cv1: f32) -> Self {
        GeneratorParameters {
            frequency: 0.0,
            level: 0.0,
            balanced_io: false,
            operation_mode: OperationMode::DcControl,
            cv0,
            cv1,
        }
    }
}

impl Default for GeneratorParameters {
    /// Power-on configuration: 1 kHz at +4 dBu, balanced.
    fn default() -> Self {
        GeneratorParameters::oscillator(1000.0, 4.0, true)
    }
}

/// Analysis handshake command type.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    /// Release the analyzer; the held window may be discarded.
    Done = 0,
    /// Capture and analyze a window, then hold the result.
    Block = 1,
}

/// Analysis command sent from the controller core.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisCommand {
    pub command_type: CommandType,
}

impl AnalysisCommand {
    pub const BLOCK: AnalysisCommand = AnalysisCommand {
        command_type: CommandType::Block,
    };

    pub const DONE: AnalysisCommand = AnalysisCommand {
        command_type: CommandType::Done,
    };
}

/// Every cross-core channel, in a fixed layout.
#[repr(C)]
pub struct SharedRegion {
    pub generator: Mailbox<GeneratorParameters>,
    pub generator_ack: Mailbox<bool>,
    pub analysis: Mailbox<AnalysisCommand>,
    pub analysis_ack: Mailbox<bool>,
    /// Ring index of the oldest buffered sample.
    pub oldest: PublishedSlot<usize>,
    /// Ring index one past the newest buffered sample.
    pub latest: PublishedSlot<usize>,
    /// Level of the last analysis result in dB.
    pub distortion_level: PublishedSlot<f32>,
    /// Frequency of the last analysis result in Hz.
    pub distortion_frequency: PublishedSlot<f32>,
}

impl SharedRegion {
    /// Total footprint of the shared block in bytes.
    pub const SIZE: usize = core::mem::size_of::<SharedRegion>();

    /// Create a region with every mailbox free and every slot zeroed.
    pub const fn new() -> Self {
        SharedRegion {
            generator: Mailbox::new(),
            generator_ack: Mailbox::new(),
            analysis: Mailbox::new(),
            analysis_ack: Mailbox::new(),
            oldest: PublishedSlot::new(),
            latest: PublishedSlot::new(),
            distortion_level: PublishedSlot::new(),
            distortion_frequency: PublishedSlot::new(),
        }
    }

    /// Initialize a region in place at a fixed physical address.
    ///
    /// # Safety
    ///
    /// `addr` must point to [`SIZE`](Self::SIZE) bytes of RAM, aligned for
    /// `SharedRegion`, visible to both cores, and not used for anything
    /// else. Exactly one core initializes; the other uses [`at()`](Self::at)
    /// once initialization is known to have happened.
    pub unsafe fn init_at(addr: usize) -> &'static SharedRegion {
        let ptr = addr as *mut SharedRegion;
        debug_assert_eq!(addr % core::mem::align_of::<SharedRegion>(), 0);
        // SAFETY: Caller guarantees the memory is ours and suitably aligned.
        unsafe {
            ptr.write(SharedRegion::new());
            &*ptr
        }
    }

    /// View an already initialized region at a fixed physical address.
    ///
    /// # Safety
    ///
    /// Same requirements as [`init_at()`](Self::init_at), and the region
    /// must already have been initialized by the peer.
    pub unsafe fn at(addr: usize) -> &'static SharedRegion {
        // SAFETY: Caller guarantees an initialized region lives at `addr`.
        unsafe { &*(addr as *const SharedRegion) }
    }
}

impl Default for SharedRegion {
    fn default() -> Self {
        Self::new()
    }
}

/// Round `offset` up to the next multiple of `align` (a power of two).
pub const fn round_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}
