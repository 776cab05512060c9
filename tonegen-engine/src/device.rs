//! Device seam between the engine and whatever drives the hardware.
//!
//! The engine never talks to an audio API directly. It asks an [`AudioDevice`]
//! to negotiate a format, hands it a [`Renderer`] once, and afterwards only
//! starts and stops it. Asynchronous notifications (interruptions, stream
//! errors) come back as [`DeviceEvent`]s over a channel the owner of the
//! engine drains on the control thread.

use std::time::Duration;

use tonegen_core::frame::{fill_silence, Frame};

use crate::error::DeviceError;
use crate::render::Renderer;

/// One I/O period of 256 frames at 44.1 kHz, in seconds.
const PERIOD_44K1_S: f64 = 0.0058;
/// Same period at 48 kHz.
const PERIOD_48K_S: f64 = 0.0053;
/// Periods per requested hardware buffer.
const PERIODS_PER_BUFFER: f64 = 4.0;

/// What the engine would like from the device. The device may grant
/// something else; the engine adapts to whatever [`StreamFormat`] comes back.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StreamRequest {
    pub preferred_sample_rate: f64,
    pub preferred_buffer_duration: Duration,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            preferred_sample_rate: 44_100.0,
            preferred_buffer_duration: Duration::from_secs_f64(PERIODS_PER_BUFFER * PERIOD_44K1_S),
        }
    }
}

impl StreamRequest {
    /// Buffer duration to ask for once the actual rate is known. Hardware
    /// running at 48 kHz gets its own period size.
    pub fn buffer_duration_for(&self, sample_rate: f64) -> Duration {
        if (sample_rate - 48_000.0).abs() < 0.5 {
            Duration::from_secs_f64(PERIODS_PER_BUFFER * PERIOD_48K_S)
        } else {
            self.preferred_buffer_duration
        }
    }

    /// Preferred buffer size in frames at `sample_rate`.
    pub fn buffer_frames_for(&self, sample_rate: f64) -> u32 {
        let frames = (self.buffer_duration_for(sample_rate).as_secs_f64() * sample_rate).round();
        // float -> int `as` saturates
        (frames as u32).max(1)
    }
}

/// Format granted by the device. The engine renders interleaved 16-bit
/// stereo and the device converts/duplicates as needed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StreamFormat {
    pub sample_rate: f64,
    pub channels: u16,
    /// `None` when the backend picks its own buffer size.
    pub buffer_frames: Option<u32>,
}

/// Notifications the device layer delivers outside the audio callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Another party took the output path (`began == true`) or released it.
    Interruption { began: bool },
    /// A non-fatal backend error worth logging.
    StreamError(String),
}

/// Hardware/OS output path as seen by the engine.
///
/// `negotiate` and `install` run once per device. `start`/`stop` may block and
/// are only ever called from the control context.
pub trait AudioDevice {
    /// Agree on a format. The device may ignore the preferences.
    fn negotiate(&mut self, request: &StreamRequest) -> Result<StreamFormat, DeviceError>;

    /// Take ownership of the render callback.
    fn install(&mut self, renderer: Renderer) -> Result<(), DeviceError>;

    /// Begin pulling frames from the renderer.
    fn start(&mut self) -> Result<(), DeviceError>;

    /// Stop pulling frames.
    fn stop(&mut self) -> Result<(), DeviceError>;
}

/// A device whose host pulls frames itself: an offline renderer, a test, or a
/// native audio callback on the far side of the FFI.
///
/// The granted sample rate is fixed at construction. After installation the
/// host either borrows the renderer through [`PullDevice::pull`] /
/// [`PullDevice::renderer_mut`] or moves it onto its own audio thread with
/// [`PullDevice::take_renderer`].
#[derive(Debug)]
pub struct PullDevice {
    sample_rate: f64,
    channels: u16,
    renderer: Option<Renderer>,
    installed: bool,
    active: bool,
}

impl PullDevice {
    pub fn new(sample_rate: f64) -> Self {
        Self { sample_rate, channels: 2, renderer: None, installed: false, active: false }
    }

    #[inline] pub fn sample_rate(&self) -> f64 { self.sample_rate }

    /// Whether the engine currently has the path started.
    #[inline] pub fn is_active(&self) -> bool { self.active }

    #[inline] pub fn is_installed(&self) -> bool { self.installed }

    pub fn renderer_mut(&mut self) -> Option<&mut Renderer> {
        self.renderer.as_mut()
    }

    /// Move the renderer out, e.g. onto a realtime thread. Returns `None` if
    /// it was never installed or was already taken.
    pub fn take_renderer(&mut self) -> Option<Renderer> {
        self.renderer.take()
    }

    /// Fill `out` from the installed renderer, or with silence if there is none.
    pub fn pull(&mut self, out: &mut [Frame]) {
        match self.renderer.as_mut() {
            Some(r) => r.fill_buffer(out),
            None => fill_silence(out),
        }
    }
}

impl AudioDevice for PullDevice {
    fn negotiate(&mut self, request: &StreamRequest) -> Result<StreamFormat, DeviceError> {
        if self.sample_rate.is_nan() || self.sample_rate <= 0.0 {
            return Err(DeviceError::UnsupportedFormat(format!("sample rate {}", self.sample_rate)));
        }
        Ok(StreamFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            buffer_frames: Some(request.buffer_frames_for(self.sample_rate)),
        })
    }

    fn install(&mut self, renderer: Renderer) -> Result<(), DeviceError> {
        if self.installed {
            return Err(DeviceError::AlreadyInstalled);
        }
        self.renderer = Some(renderer);
        self.installed = true;
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        if !self.installed {
            return Err(DeviceError::NotInstalled);
        }
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.active = false;
        Ok(())
    }
}
