//! tonegen Engine — timed sine tone with a realtime pull callback.
//!
//! Crate layout:
//! - [`engine`]  : `ToneEngine`, the control-side surface (start/stop/setters/interruptions)
//! - [`render`]  : `Renderer`, the callback-side half that owns the oscillator phase
//! - [`device`]  : `AudioDevice` seam, stream negotiation types, `PullDevice`
//! - [`cpal_backend`] : `CpalDevice` output via CPAL (feature `realtime`)
//! - [`error`]   : device and engine error types
//!
//! Two execution contexts meet here. The control context owns the
//! `ToneEngine` and may block on device configuration. The callback context
//! owns the `Renderer` and must never block, allocate or log. They share only
//! a handful of scalar atomics.

pub mod device;
pub mod engine;
pub mod error;
pub mod render;
mod shared;

#[cfg(test)]
mod scenarios;

#[cfg(feature = "realtime")]
pub mod cpal_backend;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use device::{AudioDevice, DeviceEvent, PullDevice, StreamFormat, StreamRequest};
pub use engine::{ToneEngine, ToneState};
pub use error::{DeviceError, EngineError};
pub use render::Renderer;
pub use tonegen_core::frame::Frame;

#[cfg(feature = "realtime")]
pub use cpal_backend::CpalDevice;
