//! Control side of the tone engine.
//!
//! `ToneEngine<D>` owns the device and the control-visible state. All of its
//! methods take `&mut self`, so start/stop/interruption handling are
//! serialized by construction; the only thing shared with the audio callback is
//! the [`Shared`] block of atomics the [`Renderer`] reads.
//!
//! State machine (running × remaining samples):
//!
//! ```text
//!            start_for_duration / activate          start_for_duration
//!   Idle ───────────────────────────────▶ ArmedSilent ─────────────────▶ Sounding
//!    ▲                                         ▲                           │
//!    │ stop / interruption began               └──── countdown hits 0 ─────┘
//!    └──────────────────────── (from any state) ─────────────────────────────
//! ```

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use tonegen_core::dsp::{duration_to_samples, normalize_frequency, volume_to_amplitude};

use crate::device::{AudioDevice, DeviceEvent, StreamFormat, StreamRequest};
use crate::error::EngineError;
use crate::render::Renderer;
use crate::shared::Shared;

/// Frequency before anyone calls `set_frequency` ('A' above concert A).
pub const DEFAULT_FREQUENCY_HZ: f64 = 880.0;
/// Amplitude before anyone calls `set_volume` (half scale).
pub const DEFAULT_AMPLITUDE: f64 = 16383.0;

/// Observable engine state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ToneState {
    /// Output path down.
    Idle,
    /// Output path up, emitting silence.
    ArmedSilent,
    /// Output path up, tone counting down.
    Sounding,
}

/// Single-voice timed sine tone bound to one output device.
pub struct ToneEngine<D: AudioDevice> {
    device: D,
    shared: Arc<Shared>,
    request: StreamRequest,
    format: Option<StreamFormat>,
    interrupted: bool,
}

impl<D: AudioDevice> ToneEngine<D> {
    /// Wrap `device` with the default stream preferences. The device is not
    /// touched until the first activation.
    pub fn new(device: D) -> Self {
        Self::with_request(device, StreamRequest::default())
    }

    pub fn with_request(device: D, request: StreamRequest) -> Self {
        Self {
            device,
            shared: Arc::new(Shared::new(DEFAULT_FREQUENCY_HZ, DEFAULT_AMPLITUDE)),
            request,
            format: None,
            interrupted: false,
        }
    }

    // ------------------------------- parameters ---------------------------------

    /// New pitch, picked up by the next buffer. Phase is not reset, so the
    /// change is abrupt but continuous. Non-positive input is clamped.
    pub fn set_frequency(&mut self, hz: f64) {
        self.shared.set_frequency(normalize_frequency(hz));
    }

    /// Volume fraction in [0,1] (clamped), mapped to `fraction · 32766`.
    pub fn set_volume(&mut self, fraction: f64) {
        self.shared.set_amplitude(volume_to_amplitude(fraction));
    }

    // ------------------------------- transport ----------------------------------

    /// Bring the output path up without arming a tone. Negotiates the format and
    /// installs the renderer on first use. Clears any pending countdown.
    ///
    /// On failure the engine stays `Idle`.
    pub fn activate(&mut self) -> Result<(), EngineError> {
        if self.is_running() {
            return Ok(());
        }

        if self.format.is_none() {
            let format = self.device.negotiate(&self.request).map_err(|e| {
                log::error!("output format negotiation failed: {e}");
                EngineError::Activation(e)
            })?;
            let renderer = Renderer::new(format.sample_rate, Arc::clone(&self.shared));
            self.device.install(renderer).map_err(|e| {
                log::error!("installing render callback failed: {e}");
                EngineError::Activation(e)
            })?;
            log::info!(
                "output path configured: {} Hz, {} ch, buffer {}",
                format.sample_rate,
                format.channels,
                format.buffer_frames.map_or_else(|| "backend default".to_string(), |n| format!("{n} frames")),
            );
            self.format = Some(format);
        }

        self.shared.set_remaining(0);
        self.device.start().map_err(|e| {
            log::error!("starting output failed: {e}");
            EngineError::Activation(e)
        })?;
        self.shared.set_running(true);
        self.interrupted = false;
        log::debug!("output started");
        Ok(())
    }

    /// Play a tone for `seconds`, activating the output first if needed.
    ///
    /// Only retriggers when idle: while a countdown is in progress the call
    /// does not restart or extend it. Returns `Ok(true)` when a new countdown
    /// was armed and `Ok(false)` when it was ignored.
    pub fn start_for_duration(&mut self, seconds: f64) -> Result<bool, EngineError> {
        if !self.is_running() {
            self.activate()?;
        }
        let samples = duration_to_samples(seconds, self.sample_rate());
        let armed = self.shared.arm(samples);
        if armed {
            log::debug!("tone armed for {samples} samples");
        } else {
            log::debug!("tone still sounding ({} samples left); start ignored", self.remaining_samples());
        }
        Ok(armed)
    }

    /// Overwrite the countdown regardless of what is sounding.
    pub fn set_tone_time(&mut self, seconds: f64) {
        self.shared.set_remaining(duration_to_samples(seconds, self.sample_rate()));
    }

    /// Take the output path down. Leaves the countdown and phase alone.
    ///
    /// A failing device is still treated as stopped; the error is returned.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        if !self.is_running() {
            return Ok(());
        }
        let result = self.device.stop();
        self.shared.set_running(false);
        match result {
            Ok(()) => {
                log::debug!("output stopped");
                Ok(())
            }
            Err(e) => {
                log::error!("stopping output failed: {e}");
                Err(EngineError::Deactivation(e))
            }
        }
    }

    /// Explicit reset: clear the countdown and ask the callback to return the
    /// phase to zero on its next buffer.
    pub fn reset(&mut self) {
        self.shared.set_remaining(0);
        self.shared.request_phase_reset();
    }

    // ------------------------------- device events ------------------------------

    /// Interruption notification from the device layer. Only the "began" edge
    /// is acted on; the engine does not resume by itself when it ends.
    pub fn on_interruption(&mut self, began: bool) {
        if !began {
            log::debug!("interruption ended; not resuming");
            return;
        }
        if self.is_running() {
            if let Err(e) = self.device.stop() {
                log::error!("stopping output after interruption failed: {e}");
            }
            self.shared.set_running(false);
            self.interrupted = true;
            log::warn!("output interrupted");
        }
    }

    /// Drain pending device notifications and dispatch them. Returns how many
    /// were handled.
    pub fn pump_events(&mut self, events: &Receiver<DeviceEvent>) -> usize {
        let mut n = 0;
        while let Ok(ev) = events.try_recv() {
            match ev {
                DeviceEvent::Interruption { began } => self.on_interruption(began),
                DeviceEvent::StreamError(msg) => log::warn!("output stream reported: {msg}"),
            }
            n += 1;
        }
        n
    }

    // ------------------------------- queries ------------------------------------

    pub fn state(&self) -> ToneState {
        if !self.is_running() {
            ToneState::Idle
        } else if self.remaining_samples() == 0 {
            ToneState::ArmedSilent
        } else {
            ToneState::Sounding
        }
    }

    #[inline] pub fn is_running(&self) -> bool { self.shared.is_running() }

    /// Whether the last deactivation came from an interruption.
    #[inline] pub fn was_interrupted(&self) -> bool { self.interrupted }

    #[inline] pub fn remaining_samples(&self) -> u64 { self.shared.remaining() }

    #[inline] pub fn frequency(&self) -> f64 { self.shared.frequency() }

    #[inline] pub fn amplitude(&self) -> f64 { self.shared.amplitude() }

    /// Granted sample rate once activated, the requested one before that.
    pub fn sample_rate(&self) -> f64 {
        self.format.map_or(self.request.preferred_sample_rate, |f| f.sample_rate)
    }

    /// Format granted by the device, if it has been negotiated.
    #[inline] pub fn format(&self) -> Option<StreamFormat> { self.format }

    #[inline] pub fn device(&self) -> &D { &self.device }

    #[inline] pub fn device_mut(&mut self) -> &mut D { &mut self.device }
}

impl<D: AudioDevice> Drop for ToneEngine<D> {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.device.stop();
            self.shared.set_running(false);
        }
    }
}

impl<D: AudioDevice> core::fmt::Debug for ToneEngine<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ToneEngine")
            .field("state", &self.state())
            .field("sr", &self.sample_rate())
            .field("remaining", &self.remaining_samples())
            .field("interrupted", &self.interrupted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::PullDevice;
    use std::sync::mpsc;
    use tonegen_core::frame::Frame;

    fn engine() -> ToneEngine<PullDevice> {
        ToneEngine::new(PullDevice::new(44_100.0))
    }

    #[test]
    fn defaults_before_activation() {
        let e = engine();
        assert_eq!(e.state(), ToneState::Idle);
        assert_eq!(e.frequency(), DEFAULT_FREQUENCY_HZ);
        assert_eq!(e.amplitude(), DEFAULT_AMPLITUDE);
        assert_eq!(e.sample_rate(), 44_100.0);
        assert!(e.format().is_none());
    }

    #[test]
    fn activation_installs_once_and_clears_countdown() {
        let mut e = engine();
        e.activate().unwrap();
        assert_eq!(e.state(), ToneState::ArmedSilent);
        assert!(e.device().is_installed());
        e.set_tone_time(1.0);
        e.stop().unwrap();
        assert_eq!(e.remaining_samples(), 44_100);
        e.activate().unwrap();
        assert_eq!(e.remaining_samples(), 0);
        assert!(e.device().is_active());
    }

    #[test]
    fn pumped_interruption_stops_output() {
        let mut e = engine();
        let (tx, rx) = mpsc::channel();
        e.start_for_duration(1.0).unwrap();
        tx.send(DeviceEvent::StreamError("xrun".into())).unwrap();
        tx.send(DeviceEvent::Interruption { began: true }).unwrap();
        tx.send(DeviceEvent::Interruption { began: false }).unwrap();
        assert_eq!(e.pump_events(&rx), 3);
        assert_eq!(e.state(), ToneState::Idle);
        assert!(e.was_interrupted());
        assert!(!e.device().is_active());
    }

    #[test]
    fn reset_zeroes_phase_via_the_callback() {
        let mut e = engine();
        e.start_for_duration(1.0).unwrap();
        let mut buf = [Frame::SILENCE; 64];
        e.device_mut().pull(&mut buf);
        assert!(e.device_mut().renderer_mut().unwrap().phase() > 0.0);
        e.reset();
        assert_eq!(e.remaining_samples(), 0);
        e.device_mut().pull(&mut buf);
        assert!(buf.iter().all(Frame::is_silent));
        assert_eq!(e.device_mut().renderer_mut().unwrap().phase(), 0.0);
    }
}
