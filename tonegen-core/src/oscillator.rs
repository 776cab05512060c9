//! Phase-accumulator sine oscillator.
//!
//! The phase lives in radians in `[0, 2π)` and is only ever advanced by one
//! increment per tick and wrapped by a single subtraction. It is never reset
//! when frequency or amplitude change, which is what keeps parameter changes
//! free of clicks.

use crate::dsp::{m_sin, normalize_frequency, normalize_sample_rate, phase_increment, TAU};
use crate::frame::{quantize, Frame};

/// Single sine partial rendered as mono duplicated to stereo.
#[derive(Copy, Clone, Debug)]
pub struct Oscillator {
    phase: f64,       // radians, [0, 2π)
    freq: f64,        // Hz, as requested
    sr: f64,          // Hz, fixed once the device format is known
    inc: f64,         // cached 2π·f/sr
}

impl Oscillator {
    #[inline]
    pub fn new(freq_hz: f64, sample_rate: f64) -> Self {
        let mut s = Self { phase: 0.0, freq: 0.0, sr: normalize_sample_rate(sample_rate), inc: 0.0 };
        s.set_frequency(freq_hz);
        s
    }

    /// Change pitch starting with the next tick. The phase is left untouched.
    #[inline]
    pub fn set_frequency(&mut self, hz: f64) {
        self.freq = normalize_frequency(hz);
        self.inc = phase_increment(self.freq, self.sr);
    }

    #[inline] pub fn frequency(&self) -> f64 { self.freq }
    #[inline] pub fn sample_rate(&self) -> f64 { self.sr }
    #[inline] pub fn phase(&self) -> f64 { self.phase }

    /// Radians added to the phase per tick.
    #[inline] pub fn increment(&self) -> f64 { self.inc }

    /// Explicit reset back to phase 0.
    #[inline] pub fn reset(&mut self) { self.phase = 0.0; }

    /// Produce one frame at `amplitude` (expected in [0, 32767]) and advance.
    #[inline]
    pub fn next_sample(&mut self, amplitude: f64) -> Frame {
        let u = m_sin(self.phase);
        self.phase += self.inc;
        if self.phase > TAU {
            self.phase -= TAU;
        }
        Frame::mono(quantize(amplitude, u))
    }

    /// Tick once per frame of `out`.
    #[inline]
    pub fn fill(&mut self, out: &mut [Frame], amplitude: f64) {
        for f in out.iter_mut() {
            *f = self.next_sample(amplitude);
        }
    }
}
