#![cfg_attr(not(feature = "std"), no_std)]
//! tonegen Core — no_std-ready primitives for a single sine partial rendered
//! as interleaved 16-bit stereo.
//!
//! Features
//! - `std`    : (default) use the Rust standard library
//! - `no-std` : build with `#![no_std]` and use `libm` as the math backend
//!
//! Modules
//! - [`dsp`]        : math backend, constants, volume/duration/frequency normalization
//! - [`frame`]      : `Frame` (one L/R pair of i16) and quantization
//! - [`oscillator`] : phase-accumulator sine oscillator
//!
//! Design
//! - No heap allocations; every call is O(1) per sample
//! - Phase is plain state owned by whoever owns the `Oscillator`
//! - Friendly to embedded / real-time targets

pub mod dsp;
pub mod frame;
pub mod oscillator;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{
        duration_to_samples, normalize_frequency, volume_to_amplitude, FULL_SCALE, MAX_AMPLITUDE,
        TAU,
    };
    pub use crate::frame::{quantize, Frame};
    pub use crate::oscillator::Oscillator;
}
