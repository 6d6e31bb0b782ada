//! Audio I/O for the pedalera rig.
//!
//! [`AudioEngine`] owns the duplex stream pair: a cpal input stream feeds
//! captured samples through a lock-free ring into the output stream, whose
//! callback is the realtime driver — monitor copy, onset detection, rhythm
//! advance, effect chain. Device hot-swap stops and restarts the pair.

mod devices;
mod engine;

pub use devices::{AudioDevice, default_device_names, list_devices};
pub use engine::AudioEngine;

use thiserror::Error;

/// Errors from the host audio layer.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Failed to enumerate audio devices.
    #[error("failed to get audio devices: {0}")]
    GetDevices(#[source] cpal::DevicesError),

    /// No input- or output-capable device available.
    #[error("no audio devices available")]
    NoDevices,

    /// Failed to open a stream on the selected device.
    #[error("failed to open stream: {0}")]
    OpenStream(#[source] cpal::BuildStreamError),

    /// Failed to start playback/capture.
    #[error("failed to start stream: {0}")]
    StartStream(#[source] cpal::PlayStreamError),
}

/// Convenience result type for audio operations.
pub type Result<T> = std::result::Result<T, AudioError>;
