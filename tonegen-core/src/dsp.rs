//! Math backend, constants and input normalization.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Clean, side-effect free helpers that are easy to test
//!
//! Conventions:
//! - All math here is `f64`; the phase accumulator needs the extra precision to
//!   stay periodic over long tones.
//! - Out-of-range inputs are clamped, never rejected. NaN maps to the lower bound.

use cfg_if::cfg_if;
use num_traits::clamp;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // libm (C math) in no_std
    if #[cfg(feature = "no-std")] {
        #[inline] pub(crate) fn m_sin(x: f64) -> f64 { libm::sin(x) }
        #[inline] pub(crate) fn m_round(x: f64) -> f64 { libm::round(x) }
    // std backend
    } else {
        #[inline] pub(crate) fn m_sin(x: f64) -> f64 { x.sin() }
        #[inline] pub(crate) fn m_round(x: f64) -> f64 { x.round() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π
pub const TAU: f64 = 2.0 * core::f64::consts::PI;

/// Scale applied to a volume fraction. One below `i16::MAX` so that full volume
/// plus rounding never reaches the clamp.
pub const FULL_SCALE: f64 = 32766.0;

/// Hard ceiling for the amplitude fed to the oscillator.
pub const MAX_AMPLITUDE: f64 = 32767.0;

/// Lowest accepted tone frequency. Non-positive requests are raised to this.
pub const MIN_FREQUENCY_HZ: f64 = 1.0;

/// Lowest accepted sample rate.
pub const MIN_SAMPLE_RATE: f64 = 1.0;

// --------------------------------- Normalization ---------------------------------

/// Map a volume fraction in [0,1] to an amplitude in [0, 32767].
#[inline]
pub fn volume_to_amplitude(fraction: f64) -> f64 {
    if fraction.is_nan() {
        return 0.0;
    }
    clamp_amplitude(clamp(fraction, 0.0, 1.0) * FULL_SCALE)
}

/// Clamp a raw amplitude into [0, 32767].
#[inline]
pub fn clamp_amplitude(amplitude: f64) -> f64 {
    if amplitude.is_nan() {
        return 0.0;
    }
    clamp(amplitude, 0.0, MAX_AMPLITUDE)
}

/// Normalize a requested frequency: NaN and non-positive values become
/// [`MIN_FREQUENCY_HZ`], +inf is capped to `f64::MAX`.
#[inline]
pub fn normalize_frequency(hz: f64) -> f64 {
    if hz.is_nan() {
        return MIN_FREQUENCY_HZ;
    }
    clamp(hz, MIN_FREQUENCY_HZ, f64::MAX)
}

/// Normalize a sample rate reported by a device.
#[inline]
pub fn normalize_sample_rate(sr: f64) -> f64 {
    if sr.is_nan() {
        return MIN_SAMPLE_RATE;
    }
    clamp(sr, MIN_SAMPLE_RATE, f64::MAX)
}

/// Phase increment per sample: `2π · f / sr`, reduced into `[0, 2π)`.
///
/// Above Nyquist the tone aliases, as any naive oscillator does. The reduction
/// only matters for `f >= sr`, where a raw increment of 2π or more would let
/// the phase escape a single wrap.
#[inline]
pub fn phase_increment(hz: f64, sample_rate: f64) -> f64 {
    (TAU * hz / sample_rate) % TAU
}

/// `round(seconds · sample_rate)` as a sample count. Negative and NaN durations
/// give 0; absurdly large ones saturate.
#[inline]
pub fn duration_to_samples(seconds: f64, sample_rate: f64) -> u64 {
    if seconds.is_nan() || seconds <= 0.0 {
        return 0;
    }
    // float -> int `as` saturates
    m_round(seconds * normalize_sample_rate(sample_rate)) as u64
}

// --------------------------------- Tests (std only) ------------------------------
