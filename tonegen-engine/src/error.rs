use std::fmt;

/// Failure reported by an [`AudioDevice`](crate::device::AudioDevice).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The host has no default output device.
    NoDevice,
    /// A device was requested by name and not found.
    DeviceNotFound(String),
    /// The device offers no format the engine can render into.
    UnsupportedFormat(String),
    /// `install` was called twice.
    AlreadyInstalled,
    /// `start`/`stop` before a renderer was installed.
    NotInstalled,
    /// Anything the audio backend reports that does not fit the above.
    Backend(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NoDevice => write!(f, "no default output device"),
            DeviceError::DeviceNotFound(name) => write!(f, "requested device not found: {name}"),
            DeviceError::UnsupportedFormat(what) => write!(f, "unsupported output format: {what}"),
            DeviceError::AlreadyInstalled => write!(f, "render callback already installed"),
            DeviceError::NotInstalled => write!(f, "render callback not installed"),
            DeviceError::Backend(msg) => write!(f, "audio backend error: {msg}"),
        }
    }
}

impl std::error::Error for DeviceError {}

/// Failure surfaced by the [`ToneEngine`](crate::engine::ToneEngine) control
/// operations. The realtime fill path has no error channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Bringing the output path up failed; the engine stays `Idle`.
    Activation(DeviceError),
    /// Taking the output path down failed; the engine still counts as stopped.
    Deactivation(DeviceError),
}

impl EngineError {
    pub fn device_error(&self) -> &DeviceError {
        match self {
            EngineError::Activation(e) | EngineError::Deactivation(e) => e,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Activation(e) => write!(f, "Device activation failed: {e}"),
            EngineError::Deactivation(e) => write!(f, "Device deactivation failed: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.device_error())
    }
}
