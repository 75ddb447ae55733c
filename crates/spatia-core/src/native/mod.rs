//! Native DSP chain contract.
//!
//! The DSP chain (equalizer, compressor, reverb, spatializer) lives outside
//! this crate. [`NativeChain`] is the fixed set of entry points it must
//! expose; the routing engine never depends on how the chain computes its
//! output.
//!
//! ## Implementations
//!
//! - [`ffi::FfiChain`] (feature `"ffi"`): the C library `libspatia_dsp`.
//! - `spatia_io::SoftwareChain`: an in-process chain with a real
//!   low-latency output stream.
//! - Recording mocks in tests.
//!
//! ## Buffer handles
//!
//! Raw sample memory crosses the contract only as a [`NativeBufferHandle`].
//! A handle is obtained from [`resolve_buffer_address`], borrows the samples
//! exclusively, and cannot outlive the call that produced it. The native side
//! reads and writes in place; ownership never moves.
//!
//! ## Threading
//!
//! All entry points take `&self`. `process_buffer` and `enqueue_preview_pcm`
//! are called from real-time threads and must not block. `create_chain` and
//! `destroy_chain` may be slow and are only called by
//! [`ChainLifecycleHolder`](crate::ChainLifecycleHolder) from control threads.

#[cfg(feature = "ffi")]
#[allow(unsafe_code)]
pub mod ffi;

use crate::Result;

/// Non-owning handle to an interleaved `f32` block for one native call.
///
/// The lifetime ties the handle to the exclusive borrow of the samples, so a
/// handle can never be stored past the buffer-processing call that resolved
/// it.
#[derive(Debug)]
pub struct NativeBufferHandle<'a> {
    samples: &'a mut [f32],
}

impl<'a> NativeBufferHandle<'a> {
    /// Native address of the first sample, as passed over the C ABI.
    #[inline]
    pub fn address(&self) -> i64 {
        self.samples.as_ptr() as usize as i64
    }

    /// Number of samples (all channels) addressable through the handle.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the handle addresses no samples. Resolved handles never do.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Read access for in-process implementations.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        self.samples
    }

    /// In-place write access for in-process implementations.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        self.samples
    }
}

/// Largest block the C ABI can describe (frame counts are `int`).
const MAX_ADDRESSABLE_SAMPLES: usize = i32::MAX as usize;

/// Resolve a sample block to a native handle.
///
/// Returns `None` (the address-0 sentinel of the C contract) for blocks that
/// native code must not touch: empty blocks and blocks larger than the ABI
/// can describe. Callers treat `None` as "cannot process natively" and pass
/// the audio through.
pub fn resolve_buffer_address(samples: &mut [f32]) -> Option<NativeBufferHandle<'_>> {
    if samples.is_empty() || samples.len() > MAX_ADDRESSABLE_SAMPLES {
        return None;
    }
    Some(NativeBufferHandle { samples })
}

/// Compressor settings passed to [`NativeChain::set_compressor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    /// Threshold in dBFS.
    pub threshold_db: f32,
    /// Compression ratio (N:1).
    pub ratio: f32,
    /// Attack time in milliseconds.
    pub attack_ms: f32,
    /// Release time in milliseconds.
    pub release_ms: f32,
    /// Makeup gain in dB.
    pub makeup_db: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -18.0,
            ratio: 3.0,
            attack_ms: 10.0,
            release_ms: 120.0,
            makeup_db: 0.0,
        }
    }
}

/// Reverb settings passed to [`NativeChain::set_reverb`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbParams {
    /// Whether the reverb stage is engaged.
    pub enabled: bool,
    /// Wet mix in 0.0..=1.0.
    pub wet: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            enabled: false,
            wet: 0.2,
        }
    }
}

/// Fixed native DSP chain contract.
///
/// Every method is synchronous and fire-and-forget except the two that
/// acquire native resources, which report failure.
pub trait NativeChain: Send + Sync {
    /// Build the chain for the given output rate.
    fn create_chain(&self, sample_rate_hz: u32) -> Result<()>;

    /// Tear the chain down.
    fn destroy_chain(&self);

    /// Set one equalizer band's gain.
    fn set_eq_band(&self, band_index: u32, gain_db: f32);

    /// Configure the compressor stage.
    fn set_compressor(&self, params: CompressorParams);

    /// Configure the reverb stage.
    fn set_reverb(&self, params: ReverbParams);

    /// Process `frames` interleaved stereo frames in place.
    fn process_buffer(&self, buffer: NativeBufferHandle<'_>, frames: usize, sample_rate_hz: u32);

    /// Start the secondary low-latency output path.
    fn start_low_latency_io(&self, sample_rate_hz: u32, frames_per_callback: u32) -> Result<()>;

    /// Stop the secondary low-latency output path.
    fn stop_low_latency_io(&self);

    /// Hand `frames` interleaved stereo frames to the low-latency path.
    fn enqueue_preview_pcm(&self, buffer: NativeBufferHandle<'_>, frames: usize, sample_rate_hz: u32);

    /// Enable or disable head-tracked spatialization.
    fn set_head_tracking_enabled(&self, enabled: bool);

    /// Update the listener yaw in degrees, (-180, 180].
    fn set_head_tracking_yaw(&self, yaw_deg: f32);

    /// Enable or disable the diagnostic test tone.
    fn set_test_tone_enabled(&self, enabled: bool);

    /// Set the test tone frequency in Hz.
    fn set_test_tone_frequency(&self, hz: f32);

    /// Set the test tone level in 0.0..=1.0.
    fn set_test_tone_level(&self, level: f32);
}
