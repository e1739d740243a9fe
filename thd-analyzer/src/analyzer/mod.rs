//! FFT-based distortion and frequency estimator.
//!
//! The analyzer runs outside the interrupt. [`update()`](SpectralAnalyzer::update)
//! waits until the ring holds enough history for the target frequency,
//! then copies the most recent raw/filtered pairs out.
//! [`process()`](SpectralAnalyzer::process) windows one of the two streams,
//! transforms it and reports the strongest bin in a search band:
//!
//! | Mode | Stream | Band |
//! |------|--------|------|
//! | [`AnalysisMode::Distortion`] | filtered | `bin(f) + 10 .. min(bin(34 f), bin(fs - 3000))` |
//! | [`AnalysisMode::FrequencyCounter`] | raw | `bin(f) - 10 .. min(bin(34 f), bin(fs - 3000))` |
//!
//! The captured window is held until [`finish()`](SpectralAnalyzer::finish).
//! All working memory is borrowed from the caller through [`AnalyzerBuffers`].

pub mod service;

pub use service::AnalyzerService;

use crate::config::SampleRate;
use crate::constants::{
    ANALYSIS_PERIODS, FUNDAMENTAL_EXCLUSION_BINS, LEVEL_FLOOR_DB, MAGNITUDE_SCALE_0DBU,
    MAX_FFT_SIZE, MAX_HARMONIC, MIN_ANALYSIS_LEN, MIN_EXTRA_LEN, MIN_FFT_SIZE,
    NYQUIST_GUARD_HZ, SETTLING_PERIODS,
};
use crate::dsp::fft::fft;
use crate::dsp::window::WindowTable;
use crate::error::{Error, Result};
use crate::ipc::OperationMode;
use crate::ring::{DelayRange, IrqMask, SharedRing};

/// Which stream to analyze and how to treat the fundamental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    /// Strongest component of the notched signal, fundamental excluded.
    #[default]
    Distortion,
    /// Strongest component of the raw signal, fundamental included.
    FrequencyCounter,
}

impl From<OperationMode> for AnalysisMode {
    fn from(mode: OperationMode) -> Self {
        match mode {
            OperationMode::FrequencyAnalysis => AnalysisMode::FrequencyCounter,
            OperationMode::Oscillator | OperationMode::DcControl => AnalysisMode::Distortion,
        }
    }
}

/// Outcome of one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistortionResult {
    /// Frequency of the strongest bin in Hz.
    pub frequency: f32,
    /// Level of the strongest bin in dB relative to 0 dBu.
    pub level: f32,
}

/// Working memory for the analyzer.
///
/// The four transform buffers must have the same power-of-two length,
/// which sets the largest FFT. `window` needs twice that length.
pub struct AnalyzerBuffers<'a> {
    pub signal_re: &'a mut [f32],
    pub signal_im: &'a mut [f32],
    pub filtered_re: &'a mut [f32],
    pub filtered_im: &'a mut [f32],
    pub window: &'a mut [f32],
}

/// Spectral analyzer over the sample ring.
pub struct SpectralAnalyzer<'a> {
    signal_re: &'a mut [f32],
    signal_im: &'a mut [f32],
    filtered_re: &'a mut [f32],
    filtered_im: &'a mut [f32],
    window: WindowTable<'a>,
    rate: SampleRate,
    max_size: usize,
    fft_size: usize,
    signal_mean: f32,
    filtered_mean: f32,
    enough_data: bool,
    result_ready: bool,
    /// Bins covered by the last search, with magnitudes left in the analyzed `re` buffer.
    searched: (usize, usize),
    analyzed: AnalysisMode,
    last: Option<DistortionResult>,
}

impl<'a> SpectralAnalyzer<'a> {
    pub fn new(buffers: AnalyzerBuffers<'a>, rate: SampleRate) -> Result<Self> {
        let n = buffers.signal_re.len();
        if !n.is_power_of_two()
            || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&n)
            || buffers.signal_im.len() != n
            || buffers.filtered_re.len() != n
            || buffers.filtered_im.len() != n
        {
            return Err(Error::InvalidLength(n));
        }
        let window = WindowTable::new(buffers.window, n)?;

        Ok(SpectralAnalyzer {
            signal_re: buffers.signal_re,
            signal_im: buffers.signal_im,
            filtered_re: buffers.filtered_re,
            filtered_im: buffers.filtered_im,
            window,
            rate,
            max_size: n,
            fft_size: 0,
            signal_mean: 0.0,
            filtered_mean: 0.0,
            enough_data: false,
            result_ready: false,
            searched: (0, 0),
            analyzed: AnalysisMode::Distortion,
            last: None,
        })
    }

    /// Build every window table now instead of on first use.
    pub fn prepare_windows(&mut self) {
        self.window.prepare_all();
    }

    /// Try to capture an analysis window for `target_hz`.
    ///
    /// Returns `Ok(true)` once a window is captured and not yet processed,
    /// `Ok(false)` while the ring holds too little history or a processed
    /// result is still held.
    pub fn update<B, M>(&mut self, ring: &SharedRing<B>, irq: &M, target_hz: f32) -> Result<bool>
    where
        B: AsRef<[i32]> + AsMut<[i32]>,
        M: IrqMask,
    {
        validate_frequency(target_hz)?;
        if self.result_ready {
            return Ok(false);
        }

        let fs = self.rate.as_f32();
        let min_len = ((ANALYSIS_PERIODS * fs / target_hz) as usize)
            .max(MIN_ANALYSIS_LEN)
            .min(self.max_size);
        let extra_len = ((SETTLING_PERIODS * fs / target_hz) as usize).max(MIN_EXTRA_LEN);
        // Targets far below 1 Hz push the settling time past any ring size
        let required = min_len.saturating_add(extra_len);
        let max_size = self.max_size;

        let signal = &mut *self.signal_re;
        let filtered = &mut *self.filtered_re;
        let captured = ring.snapshot(irq, |ring| {
            let available = ring.used() / 2;
            if available < required {
                return None;
            }
            let size = prev_power_of_two(available).min(max_size);
            let range = ring.delay_range(2 * size);
            let (signal_mean, filtered_mean) = split_input(range, &mut signal[..size], &mut filtered[..size]);
            Some((size, signal_mean, filtered_mean))
        });

        match captured {
            Some((size, signal_mean, filtered_mean)) => {
                self.fft_size = size;
                self.signal_mean = signal_mean;
                self.filtered_mean = filtered_mean;
                self.enough_data = true;
                log::trace!("captured {} sample pairs for {} Hz", size, target_hz);
            }
            None => self.enough_data = false,
        }
        Ok(self.can_process())
    }

    /// `true` if a captured window is waiting for [`process()`](Self::process).
    pub fn can_process(&self) -> bool {
        self.enough_data && !self.result_ready
    }

    /// Forget the captured window.
    pub fn refresh(&mut self) {
        self.enough_data = false;
    }

    /// Analyze the captured window.
    pub fn process(&mut self, target_hz: f32, mode: AnalysisMode) -> Result<DistortionResult> {
        validate_frequency(target_hz)?;
        if !self.can_process() {
            return Err(Error::NotReady);
        }

        let n = self.fft_size;
        let fs = self.rate.as_f32();
        let (re, im, mean) = match mode {
            AnalysisMode::FrequencyCounter => (&mut self.signal_re[..n], &mut self.signal_im[..n], self.signal_mean),
            AnalysisMode::Distortion => (&mut self.filtered_re[..n], &mut self.filtered_im[..n], self.filtered_mean),
        };

        let window = self.window.window(n)?;
        for (x, w) in re.iter_mut().zip(window) {
            *x = (*x - mean) * w;
        }
        im.fill(0.0);
        fft(re, im)?;

        let target_bin = frequency_bin(target_hz, n, fs);
        let start = match mode {
            AnalysisMode::FrequencyCounter => target_bin - FUNDAMENTAL_EXCLUSION_BINS,
            AnalysisMode::Distortion => target_bin + FUNDAMENTAL_EXCLUSION_BINS,
        };
        let end = frequency_bin(target_hz * MAX_HARMONIC, n, fs).min(frequency_bin(fs - NYQUIST_GUARD_HZ, n, fs));
        let start = clamp_bin(start, n);
        let end = clamp_bin(end, n);

        let scale = MAGNITUDE_SCALE_0DBU / n as f32;
        let mut peak = 0.0f32;
        let mut peak_bin = 0usize;
        for i in start..end {
            let magnitude = libm::hypotf(re[i], im[i]) * scale;
            re[i] = magnitude;
            if magnitude > peak {
                peak = magnitude;
                peak_bin = i;
            }
        }

        let result = DistortionResult {
            frequency: bin_frequency(peak_bin, n, fs),
            level: magnitude_db(peak),
        };
        self.searched = (start, end.max(start));
        self.analyzed = mode;
        self.result_ready = true;
        self.last = Some(result);
        log::debug!(
            "{:?} analysis at {} Hz over {} points: {} dB at {} Hz",
            mode,
            target_hz,
            n,
            result.level,
            result.frequency
        );
        Ok(result)
    }

    /// Release the processed window so a new one can be captured.
    pub fn finish(&mut self) {
        self.result_ready = false;
    }

    /// The most recent result, if any analysis has run.
    pub fn last_result(&self) -> Option<DistortionResult> {
        self.last
    }

    /// Magnitudes of the bins searched by the last [`process()`](Self::process).
    ///
    /// Returns the index of the first bin and the magnitudes (linear, 0 dBu
    /// scale). Empty before the first analysis.
    pub fn spectrum(&self) -> (usize, &[f32]) {
        let (start, end) = self.searched;
        let re: &[f32] = match self.analyzed {
            AnalysisMode::FrequencyCounter => &self.signal_re[..],
            AnalysisMode::Distortion => &self.filtered_re[..],
        };
        (start, &re[start..end])
    }

    /// Size of the captured window, or 0 before the first capture.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Largest window these buffers allow.
    pub fn max_fft_size(&self) -> usize {
        self.max_size
    }

    /// Means of the raw and filtered streams of the captured window.
    pub fn means(&self) -> (f32, f32) {
        (self.signal_mean, self.filtered_mean)
    }
}

fn validate_frequency(target_hz: f32) -> Result<()> {
    if !target_hz.is_finite() || target_hz <= 0.0 {
        log::warn!("rejecting analysis target {} Hz", target_hz);
        return Err(Error::InvalidFrequency(target_hz));
    }
    Ok(())
}

/// De-interleave `signal.len()` raw/filtered pairs and return the two means.
///
/// Means are integer averages (truncated) of the integer samples.
fn split_input(mut range: DelayRange<'_>, signal: &mut [f32], filtered: &mut [f32]) -> (f32, f32) {
    let mut signal_sum = 0i64;
    let mut filtered_sum = 0i64;
    for (s, f) in signal.iter_mut().zip(filtered.iter_mut()) {
        let value = range.value();
        signal_sum += value as i64;
        *s = value as f32;
        range.advance();

        let value = range.value();
        filtered_sum += value as i64;
        *f = value as f32;
        range.advance();
    }
    let n = signal.len().max(1) as i64;
    ((signal_sum / n) as f32, (filtered_sum / n) as f32)
}

fn prev_power_of_two(n: usize) -> usize {
    if n == 0 {
        0
    } else {
        1 << (usize::BITS - 1 - n.leading_zeros())
    }
}

/// FFT bin nearest below `frequency` (rounded to whole Hz first).
fn frequency_bin(frequency: f32, size: usize, fs: f32) -> i32 {
    (libm::roundf(frequency) as f64 * (size as f64 / fs as f64)) as i32
}

fn bin_frequency(index: usize, size: usize, fs: f32) -> f32 {
    (index as f64 * (fs as f64 / size as f64)) as f32
}

fn clamp_bin(bin: i32, size: usize) -> usize {
    bin.clamp(1, (size / 2) as i32) as usize
}

fn magnitude_db(magnitude: f32) -> f32 {
    if magnitude <= 0.0 {
        return LEVEL_FLOOR_DB;
    }
    20.0 * libm::log10f(magnitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::{RingBuffer, Unmasked};
    use core::f64::consts::PI;

    const FS: f64 = 48_000.0;

    struct Storage {
        re: Vec<f32>,
        im: Vec<f32>,
        fre: Vec<f32>,
        fim: Vec<f32>,
        window: Vec<f32>,
    }

    impl Storage {
        fn new(n: usize) -> Self {
            Storage {
                re: vec![0.0; n],
                im: vec![0.0; n],
                fre: vec![0.0; n],
                fim: vec![0.0; n],
                window: vec![0.0; 2 * n],
            }
        }

        fn analyzer(&mut self) -> SpectralAnalyzer<'_> {
            let buffers = AnalyzerBuffers {
                signal_re: &mut self.re,
                signal_im: &mut self.im,
                filtered_re: &mut self.fre,
                filtered_im: &mut self.fim,
                window: &mut self.window,
            };
            SpectralAnalyzer::new(buffers, SampleRate::Hz48000).unwrap()
        }
    }

    fn tone(amplitude: f64, frequency: f64, n: usize) -> i32 {
        (amplitude * (2.0 * PI * frequency * n as f64 / FS).sin()) as i32
    }

    fn fill<B: AsRef<[i32]> + AsMut<[i32]>>(ring: &SharedRing<B>, pairs: usize, f: impl Fn(usize) -> (i32, i32)) {
        ring.produce(|r| {
            for n in 0..pairs {
                let (raw, filtered) = f(n);
                r.insert(raw);
                r.insert(filtered);
            }
        });
    }

    #[test]
    fn bin_conversions() {
        assert_eq!(frequency_bin(1000.0, 4096, 48_000.0), 85);
        assert_eq!(frequency_bin(3000.0, 4096, 48_000.0), 256);
        assert_eq!(frequency_bin(999.6, 4096, 48_000.0), 85);
        assert_eq!(bin_frequency(256, 4096, 48_000.0), 3000.0);
        assert_eq!(clamp_bin(-5, 4096), 1);
        assert_eq!(clamp_bin(5000, 4096), 2048);
        assert_eq!(prev_power_of_two(5000), 4096);
        assert_eq!(prev_power_of_two(4096), 4096);
        assert_eq!(prev_power_of_two(1), 1);
        assert_eq!(magnitude_db(0.0), -144.4);
        assert!((magnitude_db(0.1) + 20.0).abs() < 1e-4);
    }

    #[test]
    fn rejects_mismatched_buffers() {
        let mut a = vec![0.0f32; 1024];
        let mut b = vec![0.0f32; 1024];
        let mut c = vec![0.0f32; 1024];
        let mut d = vec![0.0f32; 512];
        let mut w = vec![0.0f32; 2048];
        let buffers = AnalyzerBuffers {
            signal_re: &mut a,
            signal_im: &mut b,
            filtered_re: &mut c,
            filtered_im: &mut d,
            window: &mut w,
        };
        assert!(matches!(
            SpectralAnalyzer::new(buffers, SampleRate::Hz48000),
            Err(Error::InvalidLength(1024))
        ));
    }

    #[test]
    fn rejects_invalid_target() {
        let mut storage = Storage::new(1024);
        let mut analyzer = storage.analyzer();
        let ring = SharedRing::new(RingBuffer::new([0i32; 64]));

        for bad in [0.0, -1000.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                analyzer.update(&ring, &Unmasked, bad),
                Err(Error::InvalidFrequency(_))
            ));
            assert!(matches!(
                analyzer.process(bad, AnalysisMode::Distortion),
                Err(Error::InvalidFrequency(_))
            ));
        }
    }

    #[test]
    fn tiny_target_never_becomes_ready() {
        let mut storage = Storage::new(1024);
        let mut analyzer = storage.analyzer();
        let ring = SharedRing::new(RingBuffer::new(vec![0i32; 8192]));
        fill(&ring, 4096, |_| (0, 0));

        for tiny in [1e-20, 1e-6, f32::MIN_POSITIVE] {
            assert_eq!(analyzer.update(&ring, &Unmasked, tiny), Ok(false));
            assert!(!analyzer.can_process());
        }
        // The ring itself is still usable afterwards
        assert_eq!(analyzer.update(&ring, &Unmasked, 1000.0), Ok(true));
    }

    #[test]
    fn waits_for_enough_history() {
        let mut storage = Storage::new(8192);
        let mut analyzer = storage.analyzer();
        let ring = SharedRing::new(RingBuffer::new(vec![0i32; 16384]));

        // At 1 kHz: 1024 window + 200 settling
        fill(&ring, 1223, |_| (0, 0));
        assert_eq!(analyzer.update(&ring, &Unmasked, 1000.0), Ok(false));
        assert!(!analyzer.can_process());
        assert_eq!(analyzer.process(1000.0, AnalysisMode::Distortion), Err(Error::NotReady));

        fill(&ring, 1, |_| (0, 0));
        assert_eq!(analyzer.update(&ring, &Unmasked, 1000.0), Ok(true));
        assert!(analyzer.can_process());
        assert_eq!(analyzer.fft_size(), 1024);
    }

    #[test]
    fn low_frequencies_need_longer_windows() {
        let mut storage = Storage::new(8192);
        let mut analyzer = storage.analyzer();
        let ring = SharedRing::new(RingBuffer::new(vec![0i32; 16384]));

        // At 100 Hz: 11 periods = 5280, 4 periods = 1920
        fill(&ring, 7199, |_| (0, 0));
        assert_eq!(analyzer.update(&ring, &Unmasked, 100.0), Ok(false));
        fill(&ring, 1, |_| (0, 0));
        assert_eq!(analyzer.update(&ring, &Unmasked, 100.0), Ok(true));
        assert_eq!(analyzer.fft_size(), 4096);
    }

    #[test]
    fn finds_injected_third_harmonic() {
        let mut storage = Storage::new(8192);
        let mut analyzer = storage.analyzer();
        let ring = SharedRing::new(RingBuffer::new(vec![0i32; 16384]));

        let amplitude = (1 << 24) as f64;
        fill(&ring, 5000, |n| (0, tone(amplitude, 3000.0, n)));

        assert_eq!(analyzer.update(&ring, &Unmasked, 1000.0), Ok(true));
        assert_eq!(analyzer.fft_size(), 4096);

        let result = analyzer.process(1000.0, AnalysisMode::Distortion).unwrap();
        let bin_width = (FS / 4096.0) as f32;
        assert!((result.frequency - 3000.0).abs() <= bin_width, "frequency {}", result.frequency);

        let expected = 20.0 * (amplitude * 0.5 * 2.430_892_34e-8).log10();
        assert!((result.level as f64 - expected).abs() < 0.5, "level {} expected {}", result.level, expected);
        assert_eq!(analyzer.last_result(), Some(result));

        // Held until finish
        assert_eq!(analyzer.update(&ring, &Unmasked, 1000.0), Ok(false));
        assert_eq!(analyzer.process(1000.0, AnalysisMode::Distortion), Err(Error::NotReady));
        analyzer.finish();
        assert_eq!(analyzer.update(&ring, &Unmasked, 1000.0), Ok(true));
    }

    #[test]
    fn frequency_counter_uses_raw_stream() {
        let mut storage = Storage::new(8192);
        let mut analyzer = storage.analyzer();
        let ring = SharedRing::new(RingBuffer::new(vec![0i32; 16384]));

        let amplitude = (1 << 26) as f64;
        fill(&ring, 5000, |n| (tone(amplitude, 1000.0, n), tone(amplitude / 1000.0, 5000.0, n)));

        assert_eq!(analyzer.update(&ring, &Unmasked, 1000.0), Ok(true));
        let result = analyzer.process(1000.0, AnalysisMode::FrequencyCounter).unwrap();
        let bin_width = (FS / 4096.0) as f32;
        assert!((result.frequency - 1000.0).abs() <= bin_width, "frequency {}", result.frequency);

        let (first, magnitudes) = analyzer.spectrum();
        assert_eq!(first, 75);
        assert!(!magnitudes.is_empty());
    }

    #[test]
    fn dc_offset_is_removed() {
        let mut storage = Storage::new(8192);
        let mut analyzer = storage.analyzer();
        let ring = SharedRing::new(RingBuffer::new(vec![0i32; 16384]));

        let amplitude = (1 << 20) as f64;
        let offset = 1 << 24;
        fill(&ring, 5000, |n| (offset, offset + tone(amplitude, 2000.0, n)));

        assert_eq!(analyzer.update(&ring, &Unmasked, 1000.0), Ok(true));
        let (signal_mean, filtered_mean) = analyzer.means();
        assert_eq!(signal_mean, offset as f32);
        // Partial periods of the tone leave a small residue in the mean
        assert!((filtered_mean - offset as f32).abs() < 4096.0);

        let result = analyzer.process(1000.0, AnalysisMode::Distortion).unwrap();
        assert!((result.frequency - 2000.0).abs() <= 12.0, "frequency {}", result.frequency);
    }

    #[test]
    fn silence_reports_floor() {
        let mut storage = Storage::new(1024);
        let mut analyzer = storage.analyzer();
        let ring = SharedRing::new(RingBuffer::new(vec![0i32; 4096]));

        fill(&ring, 2000, |_| (0, 0));
        assert_eq!(analyzer.update(&ring, &Unmasked, 1000.0), Ok(true));
        let result = analyzer.process(1000.0, AnalysisMode::Distortion).unwrap();
        assert_eq!(result.level, LEVEL_FLOOR_DB);
        assert_eq!(result.frequency, 0.0);
    }

    #[test]
    fn refresh_drops_captured_window() {
        let mut storage = Storage::new(1024);
        let mut analyzer = storage.analyzer();
        let ring = SharedRing::new(RingBuffer::new(vec![0i32; 4096]));

        fill(&ring, 2000, |_| (0, 0));
        assert_eq!(analyzer.update(&ring, &Unmasked, 1000.0), Ok(true));
        analyzer.refresh();
        assert!(!analyzer.can_process());
        assert_eq!(analyzer.process(1000.0, AnalysisMode::Distortion), Err(Error::NotReady));
    }

    #[test]
    fn mode_from_operation_mode() {
        assert_eq!(AnalysisMode::from(OperationMode::Oscillator), AnalysisMode::Distortion);
        assert_eq!(AnalysisMode::from(OperationMode::FrequencyAnalysis), AnalysisMode::FrequencyCounter);
        assert_eq!(AnalysisMode::from(OperationMode::DcControl), AnalysisMode::Distortion);
    }
}
