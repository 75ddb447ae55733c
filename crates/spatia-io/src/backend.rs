//! Pluggable audio output backend.
//!
//! [`AudioBackend`] decouples the low-latency IO path from a specific
//! platform audio API. [`CpalBackend`](crate::CpalBackend) drives real
//! devices; [`ManualBackend`] hands the callback to the caller so tests and
//! offline tools can pull buffers deterministically.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  SoftwareChain (preview IO)  │
//! └──────────────┬───────────────┘
//!                │ build_output_stream
//!                ▼
//! ┌──────────────────────────────┐
//! │      AudioBackend trait      │
//! └──────────────┬───────────────┘
//!        ┌───────┴────────┐
//!        ▼                ▼
//! ┌─────────────┐  ┌──────────────┐
//! │ CpalBackend │  │ ManualBackend│
//! └─────────────┘  └──────────────┘
//! ```
//!
//! Callbacks are boxed closures so the trait stays object-safe. Streams are
//! returned as a type-erased [`StreamHandle`] that stops the stream on drop.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{AudioDevice, Result};

/// Configuration for building an output stream.
#[derive(Debug, Clone)]
pub struct BackendStreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Optional device name filter (system default if `None`).
    pub device_name: Option<String>,
}

impl Default for BackendStreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            channels: 2,
            device_name: None,
        }
    }
}

/// Type-erased stream handle. The stream runs while the handle exists.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Keep `stream` alive until this handle is dropped.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Output callback: fill interleaved `f32` samples `[L0, R0, L1, R1, ...]`.
///
/// Runs on the audio thread; must not allocate, block or perform I/O.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Error callback with a human-readable message.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Pluggable output backend.
pub trait AudioBackend: Send {
    /// Backend name ("cpal", "manual", ...).
    fn name(&self) -> &str;

    /// Output devices this backend can open.
    fn list_devices(&self) -> Result<Vec<AudioDevice>>;

    /// Default output device, if any.
    fn default_output_device(&self) -> Result<Option<AudioDevice>>;

    /// Build and start an output stream.
    ///
    /// The returned [`StreamHandle`] keeps the stream alive; dropping it stops
    /// playback.
    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;
}

type SharedCallback = Arc<Mutex<Option<(BackendStreamConfig, OutputCallback)>>>;

/// Backend whose stream is pulled by the caller.
///
/// [`pull`](Self::pull) runs the registered callback once, as an audio device
/// would. Dropping the stream handle unregisters the callback.
#[derive(Clone, Default)]
pub struct ManualBackend {
    active: SharedCallback,
}

struct ManualStream {
    active: SharedCallback,
}

impl Drop for ManualStream {
    fn drop(&mut self) {
        self.active.lock().take();
    }
}

impl ManualBackend {
    /// Backend with no stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a stream is currently open.
    pub fn is_streaming(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Config of the open stream.
    pub fn stream_config(&self) -> Option<BackendStreamConfig> {
        self.active.lock().as_ref().map(|(config, _)| config.clone())
    }

    /// Pull `frames` frames from the open stream. Returns `None` when no
    /// stream is open.
    pub fn pull(&self, frames: usize) -> Option<Vec<f32>> {
        let mut active = self.active.lock();
        let (config, callback) = active.as_mut()?;
        let mut buffer = vec![0.0; frames * usize::from(config.channels)];
        callback(&mut buffer);
        Some(buffer)
    }
}

impl AudioBackend for ManualBackend {
    fn name(&self) -> &str {
        "manual"
    }

    fn list_devices(&self) -> Result<Vec<AudioDevice>> {
        Ok(vec![AudioDevice {
            name: "manual".to_string(),
            default_sample_rate: 48000,
            is_default: true,
        }])
    }

    fn default_output_device(&self) -> Result<Option<AudioDevice>> {
        Ok(self.list_devices()?.into_iter().next())
    }

    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        _error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        *self.active.lock() = Some((config.clone(), callback));
        Ok(StreamHandle::new(ManualStream {
            active: Arc::clone(&self.active),
        }))
    }
}

impl std::fmt::Debug for ManualBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualBackend")
            .field("streaming", &self.is_streaming())
            .finish()
    }
}
