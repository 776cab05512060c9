//! Output through CPAL.
//!
//! `CpalDevice` negotiates a stream config close to the engine's request
//! (stereo, 16-bit, 44.1 kHz, ~1024-frame buffers), builds the output stream
//! once around the [`Renderer`], and from then on only plays/pauses it.
//! Whatever the device channel count, the tone's left/right pair goes to the
//! first two channels and the left sample is duplicated to the rest.
//!
//! Stream errors arrive on CPAL's error callback thread. They are logged there
//! and forwarded as [`DeviceEvent`]s; `DeviceNotAvailable` counts as an
//! interruption that has begun.

use std::sync::mpsc::Sender;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::device::{AudioDevice, DeviceEvent, StreamFormat, StreamRequest};
use crate::error::DeviceError;
use crate::render::Renderer;

/// Rates tried, in order, when the requested one is not supported.
const FALLBACK_RATES: [u32; 2] = [44_100, 48_000];

pub struct CpalDevice {
    device: cpal::Device,
    config: Option<cpal::StreamConfig>,
    sample_format: Option<cpal::SampleFormat>,
    stream: Option<cpal::Stream>,
    events: Option<Sender<DeviceEvent>>,
}

impl CpalDevice {
    /// The host's default output device.
    pub fn default_output() -> Result<Self, DeviceError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(DeviceError::NoDevice)?;
        Ok(Self::from_device(device))
    }

    /// An output device by exact name.
    pub fn by_name(name: &str) -> Result<Self, DeviceError> {
        let host = cpal::default_host();
        for d in host.output_devices().map_err(backend)? {
            if d.name().map_err(backend)? == name {
                return Ok(Self::from_device(d));
            }
        }
        Err(DeviceError::DeviceNotFound(name.to_string()))
    }

    pub fn from_device(device: cpal::Device) -> Self {
        Self { device, config: None, sample_format: None, stream: None, events: None }
    }

    /// Names of every output device on the default host.
    pub fn output_device_names() -> Result<Vec<String>, DeviceError> {
        let host = cpal::default_host();
        let mut names = Vec::new();
        for d in host.output_devices().map_err(backend)? {
            names.push(d.name().map_err(backend)?);
        }
        Ok(names)
    }

    /// Forward stream notifications to `events`.
    #[must_use]
    pub fn with_events(mut self, events: Sender<DeviceEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "<unnamed>".to_string())
    }

    /// Pick the supported config range closest to stereo i16 at `want_sr`.
    fn choose_config(&self, want_sr: u32) -> Result<cpal::SupportedStreamConfig, DeviceError> {
        let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
        for range in self.device.supported_output_configs().map_err(backend)? {
            let fmt_pen: u64 = match range.sample_format() {
                cpal::SampleFormat::I16 => 0,
                cpal::SampleFormat::F32 => 1,
                cpal::SampleFormat::U16 => 2,
                _ => continue,
            };
            let ch_pen = u64::from(range.channels().abs_diff(2));
            let sr_min = range.min_sample_rate().0;
            let sr_max = range.max_sample_rate().0;
            let sr_pen = if (sr_min..=sr_max).contains(&want_sr) {
                0
            } else if FALLBACK_RATES.iter().any(|r| (sr_min..=sr_max).contains(r)) {
                1
            } else {
                u64::from(sr_min.abs_diff(want_sr).min(sr_max.abs_diff(want_sr))) + 2
            };

            let score = sr_pen.saturating_mul(1000) + ch_pen * 10 + fmt_pen;
            if best.as_ref().map_or(true, |(s, _)| score < *s) {
                best = Some((score, range));
            }
        }

        let (_, range) = best.ok_or_else(|| {
            DeviceError::UnsupportedFormat("no i16/f32/u16 output configs".to_string())
        })?;

        let lo = range.min_sample_rate().0;
        let hi = range.max_sample_rate().0;
        let pick = std::iter::once(want_sr)
            .chain(FALLBACK_RATES)
            .find(|r| (lo..=hi).contains(r))
            .unwrap_or_else(|| want_sr.clamp(lo, hi));
        Ok(range.with_sample_rate(cpal::SampleRate(pick)))
    }

    fn build_stream<T>(&self, cfg: &cpal::StreamConfig, mut renderer: Renderer) -> Result<cpal::Stream, DeviceError>
    where
        T: cpal::SizedSample + cpal::FromSample<i16> + Send + 'static,
    {
        let channels = usize::from(cfg.channels.max(1));
        let events = self.events.clone();
        let err_fn = move |e: cpal::StreamError| {
            log::error!("[cpal] stream error: {e}");
            let ev = match e {
                cpal::StreamError::DeviceNotAvailable => DeviceEvent::Interruption { began: true },
                cpal::StreamError::BackendSpecific { err } => DeviceEvent::StreamError(err.description),
            };
            if let Some(tx) = &events {
                let _ = tx.send(ev);
            }
        };

        let stream = self
            .device
            .build_output_stream(
                cfg,
                move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let frames = output.len() / channels;
                    renderer.render(frames, |i, f| {
                        let frame = &mut output[i * channels..(i + 1) * channels];
                        let left = T::from_sample(f.left);
                        for s in frame.iter_mut() {
                            *s = left;
                        }
                        if channels > 1 {
                            frame[1] = T::from_sample(f.right);
                        }
                    });
                    for s in output[frames * channels..].iter_mut() {
                        *s = T::EQUILIBRIUM;
                    }
                },
                err_fn,
                None,
            )
            .map_err(backend)?;
        Ok(stream)
    }
}

impl AudioDevice for CpalDevice {
    fn negotiate(&mut self, request: &StreamRequest) -> Result<StreamFormat, DeviceError> {
        // float -> int `as` saturates
        let want_sr = request.preferred_sample_rate.round() as u32;
        let supported = self.choose_config(want_sr)?;
        let sample_format = supported.sample_format();
        let buffer_range = supported.buffer_size().clone();
        let mut cfg = supported.config();

        let sr = f64::from(cfg.sample_rate.0);
        let wanted_frames = request.buffer_frames_for(sr);
        let buffer_frames = match buffer_range {
            cpal::SupportedBufferSize::Range { min, max } => {
                let n = wanted_frames.clamp(min, max);
                cfg.buffer_size = cpal::BufferSize::Fixed(n);
                Some(n)
            }
            cpal::SupportedBufferSize::Unknown => {
                cfg.buffer_size = cpal::BufferSize::Default;
                None
            }
        };

        log::info!("using output device {:?} ({sample_format:?})", self.name());
        let format = StreamFormat { sample_rate: sr, channels: cfg.channels, buffer_frames };
        self.config = Some(cfg);
        self.sample_format = Some(sample_format);
        Ok(format)
    }

    fn install(&mut self, renderer: Renderer) -> Result<(), DeviceError> {
        if self.stream.is_some() {
            return Err(DeviceError::AlreadyInstalled);
        }
        let cfg = self.config.clone().ok_or(DeviceError::NotInstalled)?;
        let stream = match self.sample_format {
            Some(cpal::SampleFormat::I16) => self.build_stream::<i16>(&cfg, renderer)?,
            Some(cpal::SampleFormat::F32) => self.build_stream::<f32>(&cfg, renderer)?,
            Some(cpal::SampleFormat::U16) => self.build_stream::<u16>(&cfg, renderer)?,
            other => return Err(DeviceError::UnsupportedFormat(format!("{other:?}"))),
        };
        self.stream = Some(stream);
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        let stream = self.stream.as_ref().ok_or(DeviceError::NotInstalled)?;
        stream.play().map_err(backend)
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        match self.stream.as_ref() {
            Some(stream) => stream.pause().map_err(backend),
            None => Ok(()),
        }
    }
}

impl core::fmt::Debug for CpalDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CpalDevice")
            .field("name", &self.name())
            .field("config", &self.config)
            .field("sample_format", &self.sample_format)
            .field("installed", &self.stream.is_some())
            .finish_non_exhaustive()
    }
}

fn backend<E: std::fmt::Display>(e: E) -> DeviceError {
    DeviceError::Backend(e.to_string())
}
