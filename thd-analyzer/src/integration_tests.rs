//! Integration tests running both cores in software.
//!
//! The codec is replaced by a loopback: whatever the chain generates comes
//! back as input on the next sample, plus an injected third harmonic, so
//! the whole measurement path can be checked without hardware:
//!
//! ```text
//! AnalysisCoordinator → SharedRegion → AnalyzerService → Mailbox → DspChain
//!        ↑                                   │                        │
//!        └──── distortion slots ←── SpectralAnalyzer ←── SharedRing ←─┘
//! ```

#[cfg(test)]
mod tests {
    use core::f64::consts::PI;
    use core::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use crate::analyzer::service::ServiceState;
    use crate::analyzer::{AnalyzerBuffers, AnalyzerService, SpectralAnalyzer};
    use crate::chain::{ChainParameters, DspChain, OutputFrame};
    use crate::config::SampleRate;
    use crate::coordinator::{AnalysisCoordinator, AnalysisState, ConfigurationState};
    use crate::ipc::{GeneratorParameters, Mailbox, SharedRegion};
    use crate::ring::{RingBuffer, SharedRing, Unmasked};
    use crate::tap::StreamTap;

    const RATE: SampleRate = SampleRate::Hz48000;
    const HARMONIC_AMPLITUDE: f64 = (1 << 22) as f64;

    /// Level the analyzer should report for the injected harmonic, after
    /// the notch cascade's slight attenuation at 3 kHz.
    fn expected_level() -> f32 {
        (20.0 * (HARMONIC_AMPLITUDE * 0.5 * 2.430_892_34e-8).log10() - 0.3) as f32
    }

    /// Codec loopback with a 3 kHz component added.
    struct Loopback {
        n: usize,
        last: OutputFrame,
    }

    impl Loopback {
        fn new() -> Self {
            Loopback {
                n: 0,
                last: OutputFrame::default(),
            }
        }

        fn run<B: AsRef<[i32]> + AsMut<[i32]>>(&mut self, chain: &mut DspChain<'_, B>, ticks: usize) {
            for _ in 0..ticks {
                let harmonic = HARMONIC_AMPLITUDE * (2.0 * PI * 3000.0 * self.n as f64 / 48_000.0).sin();
                let x = self.last.positive + harmonic as i32;
                self.last = chain.tick([x; 4]);
                self.n += 1;
            }
        }
    }

    struct Memory {
        buffers: [Vec<f32>; 4],
        window: Vec<f32>,
    }

    impl Memory {
        fn new(size: usize) -> Self {
            Memory {
                buffers: [vec![0.0; size], vec![0.0; size], vec![0.0; size], vec![0.0; size]],
                window: vec![0.0; 2 * size],
            }
        }

        fn analyzer(&mut self) -> SpectralAnalyzer<'_> {
            let [a, b, c, d] = &mut self.buffers;
            SpectralAnalyzer::new(
                AnalyzerBuffers {
                    signal_re: a,
                    signal_im: b,
                    filtered_re: c,
                    filtered_im: d,
                    window: &mut self.window,
                },
                RATE,
            )
            .unwrap()
        }
    }

    #[test]
    fn measured_harmonic_reaches_controller() {
        let region = SharedRegion::new();
        let chain_parameters = Mailbox::new();
        let ring = SharedRing::new(RingBuffer::new(vec![0i32; 16384]));
        let mut memory = Memory::new(4096);

        let initial = ChainParameters::new(&GeneratorParameters::default(), RATE);
        let mut chain = DspChain::new(&chain_parameters, &ring, &region, initial);
        let mut service = AnalyzerService::new(&region, &chain_parameters, &ring, Unmasked, memory.analyzer(), RATE);
        let coordinator = AnalysisCoordinator::new(&region);
        let mut codec = Loopback::new();

        // One millisecond of audio per controller tick
        let mut step = |chain: &mut DspChain<'_, Vec<i32>>, service: &mut AnalyzerService<'_, Vec<i32>, Unmasked>| {
            codec.run(chain, 48);
            service.poll().unwrap();
            coordinator.update();
        };

        coordinator.set_configuration(GeneratorParameters::oscillator(1000.0, 4.0, false));
        for _ in 0..3 {
            step(&mut chain, &mut service);
        }
        assert_eq!(coordinator.state().0, ConfigurationState::Idle);
        assert!(!chain.parameters().balanced_io);
        assert_eq!(service.settings().level, 4.0);

        // Let the notch settle well past the minimum
        for _ in 0..60 {
            step(&mut chain, &mut service);
        }

        let session = coordinator.session();
        let mut polls = 0;
        while !session.is_available() {
            step(&mut chain, &mut service);
            polls += 1;
            assert!(polls < 10, "no result after {} ms", polls);
        }
        session.read(|| {});
        let result = session.result();

        assert_eq!(service.state(), ServiceState::Holding);
        let fft_size = service.analyzer().fft_size();
        assert!(fft_size >= 2048, "fft size {}", fft_size);
        let bin_width = 48_000.0 / fft_size as f32;
        assert!((result.frequency - 3000.0).abs() <= bin_width, "frequency {}", result.frequency);
        assert!(
            (result.level - expected_level()).abs() < 1.0,
            "level {} expected {}",
            result.level,
            expected_level()
        );

        drop(session);
        for _ in 0..2 {
            step(&mut chain, &mut service);
        }
        assert_eq!(coordinator.state(), (ConfigurationState::Idle, AnalysisState::Idle));
        assert_eq!(service.state(), ServiceState::Idle);
    }

    #[test]
    fn configuration_change_discards_old_history() {
        let region = SharedRegion::new();
        let chain_parameters = Mailbox::new();
        let ring = SharedRing::new(RingBuffer::new(vec![0i32; 16384]));
        let mut memory = Memory::new(4096);

        let initial = ChainParameters::new(&GeneratorParameters::default(), RATE);
        let mut chain = DspChain::new(&chain_parameters, &ring, &region, initial);
        let mut service = AnalyzerService::new(&region, &chain_parameters, &ring, Unmasked, memory.analyzer(), RATE);
        let coordinator = AnalysisCoordinator::new(&region);
        let mut codec = Loopback::new();

        codec.run(&mut chain, 4000);
        assert!(ring.used(&Unmasked) > 4000);

        coordinator.set_configuration(GeneratorParameters::oscillator(2000.0, 0.0, true));
        coordinator.update();
        service.poll().unwrap();
        codec.run(&mut chain, 1);
        assert_eq!(ring.used(&Unmasked), 2);

        // The ack is drained on the next controller tick
        coordinator.update();
        assert_eq!(coordinator.state().0, ConfigurationState::Idle);
    }

    #[test]
    fn stream_tap_sees_every_sample() {
        let region = SharedRegion::new();
        let chain_parameters = Mailbox::new();
        let ring = SharedRing::new(RingBuffer::new(vec![0i32; 1024]));

        let initial = ChainParameters::new(&GeneratorParameters::default(), RATE);
        let mut chain = DspChain::new(&chain_parameters, &ring, &region, initial);
        let mut tap = StreamTap::new(&region);
        let mut out = vec![0i32; 1024];

        // Ramp input; the ring wraps many times but the tap keeps up
        let mut expected = 0i32;
        for block in 0..50 {
            for i in 0..100 {
                let x = (block * 100 + i) * 4;
                chain.tick([x; 4]);
            }
            let n = tap.poll(&ring, &mut out);
            assert_eq!(n, 200);
            for raw in out[..n].iter().step_by(2) {
                assert_eq!(*raw, expected);
                expected += 4;
            }
        }
    }

    /// Raises `stop` when dropped, so a failing thread releases the others.
    struct StopOnDrop<'a>(&'a AtomicBool);

    impl Drop for StopOnDrop<'_> {
        fn drop(&mut self) {
            self.0.store(true, Ordering::Relaxed);
        }
    }

    #[test]
    fn cores_on_threads() {
        let region = SharedRegion::new();
        let chain_parameters = Mailbox::new();
        let ring = SharedRing::new(RingBuffer::new(vec![0i32; 16384]));
        let coordinator = AnalysisCoordinator::new(&region);
        let stop = AtomicBool::new(false);
        let mut memory = Memory::new(4096);

        thread::scope(|s| {
            // DSP core: interrupt and idle loop
            s.spawn(|| {
                let _stop = StopOnDrop(&stop);
                let initial = ChainParameters::new(&GeneratorParameters::default(), RATE);
                let mut chain = DspChain::new(&chain_parameters, &ring, &region, initial);
                let mut service =
                    AnalyzerService::new(&region, &chain_parameters, &ring, Unmasked, memory.analyzer(), RATE);
                let mut codec = Loopback::new();
                while !stop.load(Ordering::Relaxed) {
                    codec.run(&mut chain, 48);
                    service.poll().unwrap();
                }
            });

            // Controller task
            s.spawn(|| {
                let _stop = StopOnDrop(&stop);
                while !stop.load(Ordering::Relaxed) {
                    coordinator.update();
                    thread::yield_now();
                }
            });

            let _stop = StopOnDrop(&stop);
            coordinator.set_configuration(GeneratorParameters::oscillator(1000.0, 4.0, true));
            {
                let session = coordinator.session();
                session.read(|| {
                    assert!(!stop.load(Ordering::Relaxed), "a core thread stopped early");
                    thread::yield_now();
                });
                let result = session.result();
                assert!((result.frequency - 3000.0).abs() <= 48_000.0 / 1024.0, "frequency {}", result.frequency);
                assert!((result.level - expected_level()).abs() < 1.5, "level {}", result.level);
            }
        });
    }
}
