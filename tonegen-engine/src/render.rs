//! Realtime render side.
//!
//! A [`Renderer`] is created by the engine when the device format is known and
//! handed to the device exactly once. From then on it lives in the audio
//! callback: it owns the oscillator (and therefore the phase) outright and reads
//! control parameters from the shared atomics at the start of every buffer.
//!
//! Design goals
//! - No dynamic allocations, locks, logging or I/O in any method here
//! - Always produce a full buffer; silence is the answer to every doubt
//! - Phase is written only from here

use std::sync::Arc;

use tonegen_core::dsp::clamp_amplitude;
use tonegen_core::frame::Frame;
use tonegen_core::oscillator::Oscillator;

use crate::shared::Shared;

/// Callback-side half of the tone engine.
pub struct Renderer {
    osc: Oscillator,
    shared: Arc<Shared>,
}

impl Renderer {
    pub(crate) fn new(sample_rate: f64, shared: Arc<Shared>) -> Self {
        let osc = Oscillator::new(shared.frequency(), sample_rate);
        Self { osc, shared }
    }

    /// Render `frames` frames, handing each one to `write(index, frame)` in
    /// order. This is the single buffer-fill protocol every output layout is
    /// built on:
    ///
    /// - not running, or no samples left: `frames` silent frames, phase untouched
    /// - samples left but amplitude 0: silent frames, phase untouched, countdown runs
    /// - otherwise: one oscillator tick per frame
    ///
    /// A sounding buffer always decrements the countdown by the whole `frames`,
    /// saturating at 0.
    #[inline]
    pub fn render<F: FnMut(usize, Frame)>(&mut self, frames: usize, mut write: F) {
        if self.shared.take_phase_reset() {
            self.osc.reset();
        }

        if !self.shared.is_running() || self.shared.remaining() == 0 {
            for i in 0..frames {
                write(i, Frame::SILENCE);
            }
            return;
        }

        let hz = self.shared.frequency();
        if hz.to_bits() != self.osc.frequency().to_bits() {
            self.osc.set_frequency(hz);
        }

        let amplitude = clamp_amplitude(self.shared.amplitude());
        if amplitude > 0.0 {
            for i in 0..frames {
                write(i, self.osc.next_sample(amplitude));
            }
        } else {
            for i in 0..frames {
                write(i, Frame::SILENCE);
            }
        }

        self.shared.consume(frames as u64);
    }

    /// Fill exactly `out.len()` frames.
    #[inline]
    pub fn fill_buffer(&mut self, out: &mut [Frame]) {
        let frames = out.len();
        self.render(frames, |i, f| out[i] = f);
    }

    /// Fill an interleaved `[L, R, L, R, ...]` buffer of `out.len() / 2`
    /// frames. A trailing odd sample is zeroed.
    #[inline]
    pub fn fill_interleaved(&mut self, out: &mut [i16]) {
        let frames = out.len() / 2;
        if out.len() % 2 == 1 {
            out[out.len() - 1] = 0;
        }
        self.render(frames, |i, f| {
            out[2 * i] = f.left;
            out[2 * i + 1] = f.right;
        });
    }

    /// Sample rate the oscillator was built for.
    #[inline] pub fn sample_rate(&self) -> f64 { self.osc.sample_rate() }

    /// Current oscillator phase in radians.
    #[inline] pub fn phase(&self) -> f64 { self.osc.phase() }

    /// Frequency the oscillator is currently rendering at.
    #[inline] pub fn frequency(&self) -> f64 { self.osc.frequency() }
}

impl core::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Renderer")
            .field("sr", &self.osc.sample_rate())
            .field("phase", &self.osc.phase())
            .finish_non_exhaustive()
    }
}
