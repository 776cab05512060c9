//! End-to-end behaviour of the control/callback pair, driven through
//! `PullDevice` and a device that fails on demand.

use tonegen_core::dsp::TAU;

use crate::{
    AudioDevice, DeviceError, EngineError, Frame, PullDevice, Renderer, StreamFormat, StreamRequest,
    ToneEngine, ToneState,
};

fn engine(sr: f64) -> ToneEngine<PullDevice> {
    ToneEngine::new(PullDevice::new(sr))
}

fn pull(e: &mut ToneEngine<PullDevice>, frames: usize) -> Vec<Frame> {
    let mut buf = vec![Frame::mono(-1); frames];
    e.device_mut().pull(&mut buf);
    buf
}

/// Device that can be told to fail at any step.
#[derive(Default)]
struct FlakyDevice {
    fail_negotiate: bool,
    fail_start: bool,
    fail_stop: bool,
    renderer: Option<Renderer>,
    starts: usize,
    stops: usize,
}

impl AudioDevice for FlakyDevice {
    fn negotiate(&mut self, _request: &StreamRequest) -> Result<StreamFormat, DeviceError> {
        if self.fail_negotiate {
            return Err(DeviceError::UnsupportedFormat("pcm_s16 interleaved".into()));
        }
        Ok(StreamFormat { sample_rate: 48_000.0, channels: 2, buffer_frames: None })
    }

    fn install(&mut self, renderer: Renderer) -> Result<(), DeviceError> {
        self.renderer = Some(renderer);
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        if self.fail_start {
            return Err(DeviceError::Backend("hardware busy".into()));
        }
        self.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.stops += 1;
        if self.fail_stop {
            return Err(DeviceError::Backend("hardware gone".into()));
        }
        Ok(())
    }
}

// ------------------------------------------------------------ scenarios

#[test]
fn scenario_a_half_volume_at_440() {
    let mut e = engine(44_100.0);
    e.set_frequency(440.0);
    e.set_volume(0.5);
    assert_eq!(e.amplitude(), 16383.0);
    e.start_for_duration(1.0).unwrap();

    let out = pull(&mut e, 3);
    let d = TAU * 440.0 / 44_100.0;
    assert_eq!(out[0], Frame::SILENCE);
    assert_eq!(out[1], Frame::mono((16383.0 * d.sin()).round() as i16));
    assert_eq!(out[2], Frame::mono((16383.0 * (2.0 * d).sin()).round() as i16));
}

#[test]
fn scenario_b_countdown() {
    let mut e = engine(44_100.0);
    e.start_for_duration(10.0).unwrap();
    assert_eq!(e.remaining_samples(), 441_000);
    pull(&mut e, 256);
    assert_eq!(e.remaining_samples(), 440_744);
}

#[test]
fn scenario_c_interruption_silences() {
    let mut e = engine(44_100.0);
    e.start_for_duration(10.0).unwrap();
    pull(&mut e, 128);
    e.on_interruption(true);
    assert!(!e.is_running());
    assert!(e.was_interrupted());
    assert_eq!(e.state(), ToneState::Idle);

    let before = e.remaining_samples();
    for _ in 0..4 {
        assert!(pull(&mut e, 256).iter().all(Frame::is_silent));
    }
    assert_eq!(e.remaining_samples(), before);
}

#[test]
fn scenario_d_muted_tone_still_counts_down() {
    let mut e = engine(44_100.0);
    e.start_for_duration(0.01).unwrap(); // 441 samples
    assert_eq!(e.remaining_samples(), 441);
    assert!(pull(&mut e, 100).iter().any(|f| !f.is_silent()));

    e.set_volume(0.0);
    let phase = e.device_mut().renderer_mut().unwrap().phase();
    assert!(pull(&mut e, 100).iter().all(Frame::is_silent));
    assert_eq!(e.remaining_samples(), 241);
    assert_eq!(e.device_mut().renderer_mut().unwrap().phase(), phase);

    pull(&mut e, 300);
    assert_eq!(e.remaining_samples(), 0);
    assert_eq!(e.state(), ToneState::ArmedSilent);
}

// ------------------------------------------------------------ properties

#[test]
fn silent_whenever_amplitude_or_countdown_is_zero() {
    let mut e = engine(48_000.0);
    e.activate().unwrap();
    for frames in [0, 1, 7, 256, 1024] {
        assert!(pull(&mut e, frames).iter().all(Frame::is_silent));
    }
    e.set_volume(0.0);
    e.start_for_duration(5.0).unwrap();
    for frames in [0, 1, 7, 256, 1024] {
        assert!(pull(&mut e, frames).iter().all(Frame::is_silent));
    }
}

#[test]
fn retrigger_only_when_idle() {
    let mut e = engine(44_100.0);
    assert!(e.start_for_duration(1.0).unwrap());
    pull(&mut e, 1000);
    let left = e.remaining_samples();
    for secs in [0.5, 1.0, 30.0, 0.0] {
        assert!(!e.start_for_duration(secs).unwrap());
        assert_eq!(e.remaining_samples(), left);
    }
    pull(&mut e, 50_000);
    assert_eq!(e.remaining_samples(), 0);
    assert!(e.start_for_duration(2.0).unwrap());
    assert_eq!(e.remaining_samples(), 88_200);
}

#[test]
fn countdown_matches_total_frames() {
    let mut e = engine(44_100.0);
    e.start_for_duration(0.1).unwrap();
    let initial = e.remaining_samples();
    let mut total = 0u64;
    for frames in [1usize, 64, 256, 333, 1024, 500, 2048, 17] {
        pull(&mut e, frames);
        total += frames as u64;
        assert_eq!(e.remaining_samples(), initial.saturating_sub(total));
    }
}

#[test]
fn parameter_changes_keep_phase() {
    let mut e = engine(44_100.0);
    e.set_frequency(440.0);
    e.set_volume(0.5);
    e.start_for_duration(1.0).unwrap();
    pull(&mut e, 200);

    let phase = e.device_mut().renderer_mut().unwrap().phase();
    assert!(phase > 0.0);
    e.set_frequency(660.0);
    e.set_volume(0.25);
    let out = pull(&mut e, 2);
    // first sample after the change sits on the old trajectory
    assert_eq!(out[0].left, (e.amplitude() * phase.sin()).round() as i16);
    let after = e.device_mut().renderer_mut().unwrap().phase();
    let mut step = after - phase;
    if step < 0.0 {
        step += TAU;
    }
    assert!((step - 2.0 * TAU * 660.0 / 44_100.0).abs() < 1e-9);
}

#[test]
fn stop_keeps_countdown_and_phase() {
    let mut e = engine(44_100.0);
    e.start_for_duration(1.0).unwrap();
    pull(&mut e, 300);
    let phase = e.device_mut().renderer_mut().unwrap().phase();
    e.stop().unwrap();
    assert_eq!(e.state(), ToneState::Idle);
    assert_eq!(e.remaining_samples(), 44_100 - 300);
    assert!(pull(&mut e, 64).iter().all(Frame::is_silent));
    assert_eq!(e.device_mut().renderer_mut().unwrap().phase(), phase);
    // stopping twice is fine
    e.stop().unwrap();
}

#[test]
fn state_machine_walk() {
    let mut e = engine(44_100.0);
    assert_eq!(e.state(), ToneState::Idle);
    e.activate().unwrap();
    assert_eq!(e.state(), ToneState::ArmedSilent);
    e.start_for_duration(0.001).unwrap();
    assert_eq!(e.state(), ToneState::Sounding);
    pull(&mut e, 1024);
    assert_eq!(e.state(), ToneState::ArmedSilent);
    e.start_for_duration(1.0).unwrap();
    e.on_interruption(false);
    assert_eq!(e.state(), ToneState::Sounding);
    e.on_interruption(true);
    assert_eq!(e.state(), ToneState::Idle);
    // no auto-resume on the end edge
    e.on_interruption(false);
    assert_eq!(e.state(), ToneState::Idle);
    e.start_for_duration(1.0).unwrap();
    assert_eq!(e.state(), ToneState::Sounding);
    assert!(!e.was_interrupted());
}

#[test]
fn out_of_range_inputs_are_clamped() {
    let mut e = engine(44_100.0);
    e.set_volume(3.0);
    assert_eq!(e.amplitude(), 32766.0);
    e.set_volume(-1.0);
    assert_eq!(e.amplitude(), 0.0);
    e.set_frequency(-440.0);
    assert!(e.frequency() > 0.0);
    assert!(e.start_for_duration(-5.0).unwrap());
    assert_eq!(e.remaining_samples(), 0);
}

#[test]
fn tone_above_nyquist_is_audible_while_sounding() {
    let mut e = engine(44_100.0);
    e.set_frequency(30_000.0);
    e.set_volume(0.5);
    e.start_for_duration(1.0).unwrap();
    let out = pull(&mut e, 4_410);
    assert_eq!(e.state(), ToneState::Sounding);
    assert!(out.iter().any(|f| f.left.saturating_abs() > 8_000));
}

#[test]
fn granted_rate_drives_the_math() {
    let mut e = ToneEngine::new(PullDevice::new(48_000.0));
    assert_eq!(e.sample_rate(), 44_100.0);
    e.start_for_duration(10.0).unwrap();
    assert_eq!(e.sample_rate(), 48_000.0);
    assert_eq!(e.remaining_samples(), 480_000);
    assert_eq!(e.format().unwrap().buffer_frames, Some(1018));
}

#[test]
fn renderer_runs_on_another_thread() {
    let mut e = engine(44_100.0);
    e.set_volume(1.0);
    e.start_for_duration(0.5).unwrap();
    let mut renderer = e.device_mut().take_renderer().unwrap();
    let handle = std::thread::spawn(move || {
        let mut buf = [0i16; 512];
        let mut loud = false;
        for _ in 0..200 {
            renderer.fill_interleaved(&mut buf);
            loud |= buf.iter().any(|&s| s != 0);
        }
        loud
    });
    assert!(handle.join().unwrap());
    assert_eq!(e.remaining_samples(), 0);
}

// ------------------------------------------------------------ device failures

#[test]
fn negotiation_failure_leaves_engine_idle() {
    let mut e = ToneEngine::new(FlakyDevice { fail_negotiate: true, ..Default::default() });
    let err = e.start_for_duration(1.0).unwrap_err();
    assert!(matches!(err, EngineError::Activation(DeviceError::UnsupportedFormat(_))));
    assert_eq!(e.state(), ToneState::Idle);
    assert_eq!(e.remaining_samples(), 0);
}

#[test]
fn start_failure_leaves_engine_idle_and_retries() {
    let mut e = ToneEngine::new(FlakyDevice { fail_start: true, ..Default::default() });
    assert!(matches!(e.activate(), Err(EngineError::Activation(DeviceError::Backend(_)))));
    assert!(!e.is_running());
    assert!(e.device().renderer.is_some());

    e.device_mut().fail_start = false;
    e.start_for_duration(1.0).unwrap();
    assert_eq!(e.state(), ToneState::Sounding);
    assert_eq!(e.remaining_samples(), 48_000);
    assert_eq!(e.device().starts, 1);
}

#[test]
fn stop_failure_is_reported_but_engine_stops() {
    let mut e = ToneEngine::new(FlakyDevice { fail_stop: true, ..Default::default() });
    e.activate().unwrap();
    assert!(matches!(e.stop(), Err(EngineError::Deactivation(_))));
    assert!(!e.is_running());
    // interruption with a failing device still lands in Idle
    e.activate().unwrap();
    e.on_interruption(true);
    assert_eq!(e.state(), ToneState::Idle);
    assert!(e.was_interrupted());
    assert_eq!(e.device().stops, 2);
}

#[test]
fn interrupted_flag_clears_only_on_successful_activation() {
    let mut e = ToneEngine::new(FlakyDevice::default());
    e.start_for_duration(1.0).unwrap();
    e.on_interruption(true);
    assert!(e.was_interrupted());

    e.device_mut().fail_start = true;
    assert!(e.start_for_duration(1.0).is_err());
    assert!(e.was_interrupted());

    e.device_mut().fail_start = false;
    e.activate().unwrap();
    assert!(!e.was_interrupted());
}
