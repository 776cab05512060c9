//! Output frame type and fixed-point quantization.
//!
//! A [`Frame`] is one interleaved stereo sample pair of signed 16-bit PCM. The
//! struct is `#[repr(C)]` so a `&[Frame]` has exactly the byte layout the
//! hardware expects (`L0 R0 L1 R1 ...`, native endian).

use crate::dsp::m_round;
use num_traits::clamp;

/// One stereo sample pair.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    /// Exact digital silence.
    pub const SILENCE: Frame = Frame { left: 0, right: 0 };

    /// Mono value duplicated to both channels.
    #[inline]
    pub const fn mono(x: i16) -> Self {
        Self { left: x, right: x }
    }

    #[inline]
    pub fn is_silent(&self) -> bool {
        self.left == 0 && self.right == 0
    }
}

/// Scale a unit sample by `amplitude` and round to the nearest i16.
///
/// `amplitude` is expected to be pre-clamped to [0, 32767]; the final clamp only
/// guards rounding at the boundary.
#[inline]
pub fn quantize(amplitude: f64, unit: f64) -> i16 {
    let x = m_round(amplitude * unit);
    clamp(x, f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

/// Overwrite every frame with silence.
#[inline]
pub fn fill_silence(out: &mut [Frame]) {
    for f in out.iter_mut() {
        *f = Frame::SILENCE;
    }
}

/// Copy frames into an interleaved `[L, R, L, R, ...]` i16 slice. Copies
/// `min(frames.len(), out.len() / 2)` frames and returns that count.
#[inline]
pub fn interleave(frames: &[Frame], out: &mut [i16]) -> usize {
    let mut n = 0;
    for (pair, f) in out.chunks_exact_mut(2).zip(frames.iter()) {
        pair[0] = f.left;
        pair[1] = f.right;
        n += 1;
    }
    n
}
