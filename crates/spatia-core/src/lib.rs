//! Spatia Core - real-time routing and DSP-chain lifecycle engine
//!
//! This crate decides, for every buffer a pull-based playback pipeline
//! delivers, whether it goes through the native DSP chain, to the
//! low-latency preview path, or straight through. It also owns the native
//! chain's lifecycle and turns a rotation sensor into a smoothed head yaw.
//!
//! # Core Abstractions
//!
//! ## Native chain
//!
//! - [`NativeChain`] - Fixed contract of the native DSP entry points
//! - [`NativeBufferHandle`] - Non-owning handle valid for one native call
//! - [`resolve_buffer_address`] - Buffer to handle, `None` when ineligible
//! - [`ChainLifecycleHolder`] - Idempotent create/recreate/destroy by rate
//!
//! ## Routing
//!
//! - [`AudioGraph`] - Routing gate, preview hand-over, head-tracking policy
//! - [`RouteTicket`] - One atomic routing decision per buffer
//! - [`FormatAdaptingProcessor`] - Pipeline stage: decode, route, re-encode
//!
//! ## Orientation
//!
//! - [`OrientationTracker`] - Sensor subscription and smoothed yaw
//! - [`YawSmoother`] - Wrap-aware exponential smoothing
//! - [`OrientationMode`] - Foreground / background-low-power rate presets
//!
//! ## Platform collaborators
//!
//! - [`OutputDeviceQuery`] - Current output sample rate
//! - [`SpatialCapabilityProbe`] - Read-only spatializer capability query
//!
//! # Threads
//!
//! [`AudioGraph::route`], [`AudioGraph::should_process_from_pull_path`] and
//! [`AudioGraph::is_preview_running`] are lock-free and may be called from
//! the audio callback. Lifecycle, preview and policy transitions run on
//! control threads and may block briefly.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use spatia_core::{AudioFormat, AudioGraph, FormatAdaptingProcessor, PcmBuffer};
//!
//! let graph = Arc::new(AudioGraph::new(chain));
//! graph.ensure_chain_created(48000)?;
//!
//! let mut processor = FormatAdaptingProcessor::new(Arc::clone(&graph));
//! processor.configure(AudioFormat::stereo_f32(48000))?;
//! processor.queue_input(&mut PcmBuffer::new(&bytes));
//! let out = processor.get_output();
//! ```
//!
//! # Features
//!
//! - `ffi` - Link `libspatia_dsp` and expose [`native::ffi::FfiChain`]

pub mod error;
pub mod format;
pub mod graph;
pub mod lifecycle;
pub mod native;
pub mod orientation;
pub mod param;
pub mod pcm;
pub mod platform;
pub mod processor;
pub mod spatial;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use error::{Error, Result};
pub use format::{AudioFormat, DEFAULT_SAMPLE_RATE_HZ, STEREO, SampleEncoding};
pub use graph::{AudioGraph, DspControls, GateState, Route, RouteTicket, SpatialPolicy};
pub use lifecycle::{ChainLifecycleHolder, ChainState};
pub use native::{
    CompressorParams, NativeBufferHandle, NativeChain, ReverbParams, resolve_buffer_address,
};
pub use orientation::{
    DisplayRotationQuery, FixedDisplayRotation, OrientationMode, OrientationTracker,
    ReplaySensor, RotationSensor, RotationVector, TrackerError, YawSmoother,
};
pub use param::{AtomicParam, db_to_linear, linear_to_db};
pub use pcm::{PcmBuffer, f32_to_i16, i16_to_f32};
pub use platform::{FixedOutputRate, OutputDeviceQuery};
pub use processor::{FormatAdaptingProcessor, OutputBuffer};
pub use spatial::{SpatialCapabilities, SpatialCapabilityProbe, SpatializerQuery, StaticSpatializer};
