//! Recording [`NativeChain`] used by unit tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::native::{CompressorParams, NativeBufferHandle, NativeChain, ReverbParams};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Create(u32),
    Destroy,
    EqBand(u32, f32),
    Compressor(CompressorParams),
    Reverb(ReverbParams),
    Process {
        frames: usize,
        sample_rate_hz: u32,
        address: i64,
    },
    StartIo {
        sample_rate_hz: u32,
        frames_per_callback: u32,
    },
    StopIo,
    Enqueue {
        frames: usize,
        sample_rate_hz: u32,
        samples: Vec<f32>,
    },
    HeadTracking(bool),
    Yaw(f32),
    ToneEnabled(bool),
    ToneFrequency(f32),
    ToneLevel(f32),
}

pub(crate) struct RecordingChain {
    calls: Mutex<Vec<Call>>,
    fail_create: AtomicBool,
    fail_start_io: AtomicBool,
    gain_bits: AtomicU32,
}

impl RecordingChain {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_create: AtomicBool::new(false),
            fail_start_io: AtomicBool::new(false),
            gain_bits: AtomicU32::new(1.0f32.to_bits()),
        }
    }

    /// Gain applied by `process_buffer`, to make processing observable.
    pub(crate) fn set_process_gain(&self, gain: f32) {
        self.gain_bits.store(gain.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn fail_next_create(&self) {
        self.fail_create.store(true, Ordering::Relaxed);
    }

    pub(crate) fn fail_next_start_io(&self) {
        self.fail_start_io.store(true, Ordering::Relaxed);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl NativeChain for RecordingChain {
    fn create_chain(&self, sample_rate_hz: u32) -> Result<()> {
        if self.fail_create.swap(false, Ordering::Relaxed) {
            return Err(Error::native("create_chain", "injected failure"));
        }
        self.record(Call::Create(sample_rate_hz));
        Ok(())
    }

    fn destroy_chain(&self) {
        self.record(Call::Destroy);
    }

    fn set_eq_band(&self, band_index: u32, gain_db: f32) {
        self.record(Call::EqBand(band_index, gain_db));
    }

    fn set_compressor(&self, params: CompressorParams) {
        self.record(Call::Compressor(params));
    }

    fn set_reverb(&self, params: ReverbParams) {
        self.record(Call::Reverb(params));
    }

    fn process_buffer(&self, mut buffer: NativeBufferHandle<'_>, frames: usize, sample_rate_hz: u32) {
        let gain = f32::from_bits(self.gain_bits.load(Ordering::Relaxed));
        let address = buffer.address();
        for s in &mut buffer.as_mut_slice()[..frames * 2] {
            *s *= gain;
        }
        self.record(Call::Process {
            frames,
            sample_rate_hz,
            address,
        });
    }

    fn start_low_latency_io(&self, sample_rate_hz: u32, frames_per_callback: u32) -> Result<()> {
        if self.fail_start_io.swap(false, Ordering::Relaxed) {
            return Err(Error::native("start_low_latency_io", "injected failure"));
        }
        self.record(Call::StartIo {
            sample_rate_hz,
            frames_per_callback,
        });
        Ok(())
    }

    fn stop_low_latency_io(&self) {
        self.record(Call::StopIo);
    }

    fn enqueue_preview_pcm(&self, buffer: NativeBufferHandle<'_>, frames: usize, sample_rate_hz: u32) {
        self.record(Call::Enqueue {
            frames,
            sample_rate_hz,
            samples: buffer.as_slice()[..frames * 2].to_vec(),
        });
    }

    fn set_head_tracking_enabled(&self, enabled: bool) {
        self.record(Call::HeadTracking(enabled));
    }

    fn set_head_tracking_yaw(&self, yaw_deg: f32) {
        self.record(Call::Yaw(yaw_deg));
    }

    fn set_test_tone_enabled(&self, enabled: bool) {
        self.record(Call::ToneEnabled(enabled));
    }

    fn set_test_tone_frequency(&self, hz: f32) {
        self.record(Call::ToneFrequency(hz));
    }

    fn set_test_tone_level(&self, level: f32) {
        self.record(Call::ToneLevel(level));
    }
}
