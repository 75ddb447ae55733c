//! Audio device layer for spatia.
//!
//! This crate provides:
//!
//! - **Backends**: the [`AudioBackend`] trait, [`CpalBackend`] for real
//!   devices and [`ManualBackend`] for deterministic, caller-driven streams
//! - **In-process chain**: [`SoftwareChain`], a [`NativeChain`] whose
//!   low-latency IO path plays preview PCM and a test tone on an output
//!   stream
//! - **WAV file I/O**: [`read_wav_interleaved`] and [`write_wav_interleaved`]
//!   for stereo 16-bit and 32-bit float files
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use spatia_core::AudioGraph;
//! use spatia_io::{CpalBackend, SoftwareChain};
//!
//! let chain = Arc::new(SoftwareChain::new(Box::new(CpalBackend::new())));
//! let graph = Arc::new(AudioGraph::new(chain.clone()));
//! graph.ensure_chain_for_output(&CpalBackend::new())?;
//! graph.start_preview(48000, 256)?;
//! ```
//!
//! [`NativeChain`]: spatia_core::NativeChain

pub mod backend;
pub mod cpal_backend;
mod devices;
pub mod software_chain;
mod wav;

pub use backend::{
    AudioBackend, BackendStreamConfig, ErrorCallback, ManualBackend, OutputCallback, StreamHandle,
};
pub use cpal_backend::CpalBackend;
pub use devices::{AudioDevice, default_output_device, list_devices};
pub use software_chain::{ChainParams, EQ_BANDS, SoftwareChain, TestTone};
pub use wav::{WavEncoding, WavInfo, read_wav_info, read_wav_interleaved, write_wav_interleaved};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The file's channel layout or sample format is not supported.
    #[error("Unsupported WAV layout: {0}")]
    UnsupportedLayout(String),

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Error> for spatia_core::Error {
    fn from(err: Error) -> Self {
        spatia_core::Error::native("audio backend", err.to_string())
    }
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
