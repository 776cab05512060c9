//! Scalar state shared between the control side and the render callback.
//!
//! Every field is an independent atomic; there is no cross-field consistency.
//! Floats travel as `f64::to_bits` in an `AtomicU64` (std has no `AtomicF64`).
//! Writers use `Release`, readers `Acquire`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tonegen_core::dsp::{clamp_amplitude, normalize_frequency};

#[derive(Debug)]
pub(crate) struct Shared {
    frequency_bits: AtomicU64,
    amplitude_bits: AtomicU64,
    remaining: AtomicU64,
    running: AtomicBool,
    phase_reset: AtomicBool,
}

impl Shared {
    pub(crate) fn new(frequency: f64, amplitude: f64) -> Self {
        Self {
            frequency_bits: AtomicU64::new(normalize_frequency(frequency).to_bits()),
            amplitude_bits: AtomicU64::new(clamp_amplitude(amplitude).to_bits()),
            remaining: AtomicU64::new(0),
            running: AtomicBool::new(false),
            phase_reset: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn frequency(&self) -> f64 {
        f64::from_bits(self.frequency_bits.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set_frequency(&self, hz: f64) {
        self.frequency_bits.store(hz.to_bits(), Ordering::Release);
    }

    #[inline]
    pub(crate) fn amplitude(&self) -> f64 {
        f64::from_bits(self.amplitude_bits.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set_amplitude(&self, amplitude: f64) {
        self.amplitude_bits.store(amplitude.to_bits(), Ordering::Release);
    }

    #[inline]
    pub(crate) fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_remaining(&self, samples: u64) {
        self.remaining.store(samples, Ordering::Release);
    }

    /// Arm a countdown only if none is in progress. Returns `false` (and leaves
    /// the counter alone) while a tone is still sounding.
    #[inline]
    pub(crate) fn arm(&self, samples: u64) -> bool {
        self.remaining
            .compare_exchange(0, samples, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Saturating decrement by `frames`.
    #[inline]
    pub(crate) fn consume(&self, frames: u64) {
        // the closure never returns None, so this cannot fail
        let _ = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |r| Some(r.saturating_sub(frames)));
    }

    #[inline]
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    #[inline]
    pub(crate) fn request_phase_reset(&self) {
        self.phase_reset.store(true, Ordering::Release);
    }

    /// Consume a pending phase-reset request.
    #[inline]
    pub(crate) fn take_phase_reset(&self) -> bool {
        self.phase_reset.swap(false, Ordering::AcqRel)
    }
}
