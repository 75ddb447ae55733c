//! cpal-based audio backend.
//!
//! [`CpalBackend`] is the default [`AudioBackend`]: ALSA on Linux, CoreAudio
//! on macOS, WASAPI on Windows, AAudio/Oboe on Android. It also answers
//! [`OutputDeviceQuery`], so the chain can be created at the rate the
//! output device actually runs at.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use spatia_io::{AudioBackend, BackendStreamConfig, CpalBackend};
//!
//! let backend = CpalBackend::new();
//! let stream = backend.build_output_stream(
//!     &BackendStreamConfig::default(),
//!     Box::new(|buffer: &mut [f32]| buffer.fill(0.0)),
//!     Box::new(|err: &str| tracing::warn!(error = err, "stream error")),
//! )?;
//! // Plays until `stream` is dropped.
//! ```

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Host, HostId};
use spatia_core::OutputDeviceQuery;

use crate::backend::{AudioBackend, BackendStreamConfig, ErrorCallback, OutputCallback, StreamHandle};
use crate::devices::device_name;
use crate::{AudioDevice, Error, Result};

/// cpal-based output backend.
///
/// Holds only the host id; the host is reopened per call so the backend is
/// `Send + Sync` on every platform.
pub struct CpalBackend {
    host_id: HostId,
    output_device: Option<String>,
}

impl CpalBackend {
    /// Backend on the platform's default host and default output device.
    pub fn new() -> Self {
        let host_id = cpal::default_host().id();
        tracing::info!(host = host_id.name(), "cpal backend initialized");
        Self {
            host_id,
            output_device: None,
        }
    }

    /// Prefer the first output device whose name contains `name`
    /// (case-insensitive).
    pub fn with_output_device(mut self, name: Option<String>) -> Self {
        self.output_device = name;
        self
    }

    fn host(&self) -> Result<Host> {
        cpal::host_from_id(self.host_id).map_err(|e| Error::Stream(e.to_string()))
    }

    /// Find an output device by name, or return the default.
    fn find_output_device(&self, name: Option<&str>) -> Result<cpal::Device> {
        let host = self.host()?;
        match name {
            Some(search) => {
                let search_lower = search.to_lowercase();
                let devices = host
                    .output_devices()
                    .map_err(|e| Error::Stream(e.to_string()))?;

                for device in devices {
                    if let Ok(dev_name) = device_name(&device) {
                        if dev_name.to_lowercase().contains(search_lower.as_str()) {
                            return Ok(device);
                        }
                    }
                }
                Err(Error::DeviceNotFound(format!(
                    "no output device matching '{}'",
                    search
                )))
            }
            None => host.default_output_device().ok_or(Error::NoDevice),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn list_devices(&self) -> Result<Vec<AudioDevice>> {
        crate::devices::list_devices()
    }

    fn default_output_device(&self) -> Result<Option<AudioDevice>> {
        crate::devices::default_output_device()
    }

    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        mut callback: OutputCallback,
        mut error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let requested = config
            .device_name
            .as_deref()
            .or(self.output_device.as_deref());
        let device = self.find_output_device(requested)?;

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback(data);
                },
                move |err| {
                    error_callback(&err.to_string());
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(
            channels = config.channels,
            sample_rate = config.sample_rate,
            buffer_size = config.buffer_size,
            "output stream started"
        );

        Ok(StreamHandle::new(stream))
    }
}

impl OutputDeviceQuery for CpalBackend {
    fn current_output_sample_rate(&self) -> Option<u32> {
        let device = self.find_output_device(self.output_device.as_deref()).ok()?;
        device.default_output_config().ok().map(|c| c.sample_rate())
    }
}

impl std::fmt::Debug for CpalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalBackend")
            .field("host", &self.host_id.name())
            .field("output_device", &self.output_device)
            .finish()
    }
}
