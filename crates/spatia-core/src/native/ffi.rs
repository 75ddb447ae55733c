//! C bindings for the native DSP library (`libspatia_dsp`).
//!
//! The library either exports the whole contract at a known ABI version or
//! it is not used at all: [`FfiChain::probe`] checks the version once at
//! startup, and there is no per-symbol lookup afterwards.
//!
//! # Safety
//!
//! Each entry point is a plain C function with no pointer arguments except
//! the buffer address, which always comes from a live
//! [`NativeBufferHandle`] whose borrow outlasts the call.

use std::os::raw::{c_float, c_int};

use super::{CompressorParams, NativeBufferHandle, NativeChain, ReverbParams};
use crate::{Error, Result};

/// ABI version this crate was written against.
pub const ABI_VERSION: c_int = 1;

mod sys {
    use std::os::raw::{c_float, c_int};

    #[link(name = "spatia_dsp")]
    unsafe extern "C" {
        pub fn spatia_dsp_abi_version() -> c_int;
        pub fn spatia_create_chain(sample_rate_hz: c_int) -> c_int;
        pub fn spatia_destroy_chain();
        pub fn spatia_set_eq_band(band_index: c_int, gain_db: c_float);
        pub fn spatia_set_compressor(
            threshold_db: c_float,
            ratio: c_float,
            attack_ms: c_float,
            release_ms: c_float,
            makeup_db: c_float,
        );
        pub fn spatia_set_reverb(enabled: bool, wet: c_float);
        pub fn spatia_process_buffer(address: i64, frames: c_int, sample_rate_hz: c_int);
        pub fn spatia_start_low_latency_io(sample_rate_hz: c_int, frames_per_callback: c_int)
        -> c_int;
        pub fn spatia_stop_low_latency_io();
        pub fn spatia_enqueue_preview_pcm(address: i64, frames: c_int, sample_rate_hz: c_int);
        pub fn spatia_set_head_tracking_enabled(enabled: bool);
        pub fn spatia_set_head_tracking_yaw(yaw_deg: c_float);
        pub fn spatia_set_test_tone_enabled(enabled: bool);
        pub fn spatia_set_test_tone_frequency(hz: c_float);
        pub fn spatia_set_test_tone_level(level: c_float);
    }
}

/// [`NativeChain`] backed by `libspatia_dsp`.
///
/// The library keeps a single chain per process; this type carries no state
/// of its own.
#[derive(Debug)]
pub struct FfiChain {
    _probed: (),
}

impl FfiChain {
    /// Verify the linked library speaks [`ABI_VERSION`].
    pub fn probe() -> Result<Self> {
        let version = unsafe { sys::spatia_dsp_abi_version() };
        if version != ABI_VERSION {
            return Err(Error::NativeUnavailable(format!(
                "libspatia_dsp ABI version {version}, expected {ABI_VERSION}"
            )));
        }
        tracing::info!(abi = version, "native DSP library linked");
        Ok(Self { _probed: () })
    }
}

#[inline]
fn as_c_int(value: impl TryInto<c_int>) -> c_int {
    value.try_into().unwrap_or(c_int::MAX)
}

impl NativeChain for FfiChain {
    fn create_chain(&self, sample_rate_hz: u32) -> Result<()> {
        let status = unsafe { sys::spatia_create_chain(as_c_int(sample_rate_hz)) };
        if status != 0 {
            return Err(Error::native(
                "create_chain",
                format!("status {status} at {sample_rate_hz} Hz"),
            ));
        }
        Ok(())
    }

    fn destroy_chain(&self) {
        unsafe { sys::spatia_destroy_chain() }
    }

    fn set_eq_band(&self, band_index: u32, gain_db: f32) {
        unsafe { sys::spatia_set_eq_band(as_c_int(band_index), gain_db as c_float) }
    }

    fn set_compressor(&self, params: CompressorParams) {
        unsafe {
            sys::spatia_set_compressor(
                params.threshold_db,
                params.ratio,
                params.attack_ms,
                params.release_ms,
                params.makeup_db,
            );
        }
    }

    fn set_reverb(&self, params: ReverbParams) {
        unsafe { sys::spatia_set_reverb(params.enabled, params.wet) }
    }

    fn process_buffer(&self, buffer: NativeBufferHandle<'_>, frames: usize, sample_rate_hz: u32) {
        unsafe {
            sys::spatia_process_buffer(
                buffer.address(),
                as_c_int(frames),
                as_c_int(sample_rate_hz),
            );
        }
    }

    fn start_low_latency_io(&self, sample_rate_hz: u32, frames_per_callback: u32) -> Result<()> {
        let status = unsafe {
            sys::spatia_start_low_latency_io(
                as_c_int(sample_rate_hz),
                as_c_int(frames_per_callback),
            )
        };
        if status != 0 {
            return Err(Error::native(
                "start_low_latency_io",
                format!("status {status}"),
            ));
        }
        Ok(())
    }

    fn stop_low_latency_io(&self) {
        unsafe { sys::spatia_stop_low_latency_io() }
    }

    fn enqueue_preview_pcm(&self, buffer: NativeBufferHandle<'_>, frames: usize, sample_rate_hz: u32) {
        unsafe {
            sys::spatia_enqueue_preview_pcm(
                buffer.address(),
                as_c_int(frames),
                as_c_int(sample_rate_hz),
            );
        }
    }

    fn set_head_tracking_enabled(&self, enabled: bool) {
        unsafe { sys::spatia_set_head_tracking_enabled(enabled) }
    }

    fn set_head_tracking_yaw(&self, yaw_deg: f32) {
        unsafe { sys::spatia_set_head_tracking_yaw(yaw_deg) }
    }

    fn set_test_tone_enabled(&self, enabled: bool) {
        unsafe { sys::spatia_set_test_tone_enabled(enabled) }
    }

    fn set_test_tone_frequency(&self, hz: f32) {
        unsafe { sys::spatia_set_test_tone_frequency(hz) }
    }

    fn set_test_tone_level(&self, level: f32) {
        unsafe { sys::spatia_set_test_tone_level(level.clamp(0.0, 1.0)) }
    }
}
