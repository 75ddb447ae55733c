//! In-process implementation of the native chain contract.
//!
//! [`SoftwareChain`] lets the engine run without `libspatia_dsp`. It keeps
//! every parameter lock-free in [`ChainParams`], applies the compressor's
//! makeup gain in `process_buffer`, and implements the low-latency IO path
//! as a real output stream on an [`AudioBackend`]:
//!
//! ```text
//!   pipeline thread                         device callback
//!   enqueue_preview_pcm ──► rtrb ring ──►  read whole frames (0.0 on underrun)
//!                                           + test tone (if enabled)
//! ```
//!
//! Both ends move whole stereo frames, so an underrun never splits a pair
//! and the channels cannot swap.
//!
//! The filter bodies (EQ, compression curve, reverb, spatializer) belong to
//! the native library and are not modelled here; their parameters are stored
//! and exposed so hosts and tests can observe them.

use std::f32::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;
use spatia_core::{
    AtomicParam, CompressorParams, NativeBufferHandle, NativeChain, ReverbParams, STEREO,
    db_to_linear,
};

use crate::backend::{AudioBackend, BackendStreamConfig, StreamHandle};

/// Number of EQ bands.
pub const EQ_BANDS: usize = 10;

/// EQ gain range in dB.
pub const EQ_RANGE_DB: f32 = 24.0;

/// Preview ring capacity in seconds of stereo audio.
const PREVIEW_RING_SECONDS: f32 = 0.5;

/// Lock-free parameter block shared with the audio callback.
#[derive(Debug)]
pub struct ChainParams {
    eq: [AtomicParam; EQ_BANDS],
    threshold_db: AtomicParam,
    ratio: AtomicParam,
    attack_ms: AtomicParam,
    release_ms: AtomicParam,
    makeup_db: AtomicParam,
    reverb_enabled: AtomicBool,
    reverb_wet: AtomicParam,
    head_tracking: AtomicBool,
    yaw_deg: AtomicParam,
    tone_enabled: AtomicBool,
    tone_hz: AtomicParam,
    tone_level: AtomicParam,
}

impl Default for ChainParams {
    fn default() -> Self {
        let compressor = CompressorParams::default();
        let reverb = ReverbParams::default();
        Self {
            eq: std::array::from_fn(|_| AtomicParam::new(0.0, -EQ_RANGE_DB, EQ_RANGE_DB)),
            threshold_db: AtomicParam::new(compressor.threshold_db, -60.0, 0.0),
            ratio: AtomicParam::new(compressor.ratio, 1.0, 20.0),
            attack_ms: AtomicParam::new(compressor.attack_ms, 0.1, 500.0),
            release_ms: AtomicParam::new(compressor.release_ms, 1.0, 5000.0),
            makeup_db: AtomicParam::new(compressor.makeup_db, -24.0, 24.0),
            reverb_enabled: AtomicBool::new(reverb.enabled),
            reverb_wet: AtomicParam::new(reverb.wet, 0.0, 1.0),
            head_tracking: AtomicBool::new(false),
            yaw_deg: AtomicParam::new(0.0, -180.0, 180.0),
            tone_enabled: AtomicBool::new(false),
            tone_hz: AtomicParam::new(440.0, 20.0, 20_000.0),
            tone_level: AtomicParam::new(0.2, 0.0, 1.0),
        }
    }
}

impl ChainParams {
    /// Gain of one EQ band in dB; `None` for an out-of-range band.
    pub fn eq_gain_db(&self, band: usize) -> Option<f32> {
        self.eq.get(band).map(AtomicParam::get)
    }

    /// Current compressor settings.
    pub fn compressor(&self) -> CompressorParams {
        CompressorParams {
            threshold_db: self.threshold_db.get(),
            ratio: self.ratio.get(),
            attack_ms: self.attack_ms.get(),
            release_ms: self.release_ms.get(),
            makeup_db: self.makeup_db.get(),
        }
    }

    /// Current reverb settings.
    pub fn reverb(&self) -> ReverbParams {
        ReverbParams {
            enabled: self.reverb_enabled.load(Ordering::Acquire),
            wet: self.reverb_wet.get(),
        }
    }

    /// Head tracking switched on.
    pub fn head_tracking_enabled(&self) -> bool {
        self.head_tracking.load(Ordering::Acquire)
    }

    /// Last head yaw in degrees.
    pub fn yaw_deg(&self) -> f32 {
        self.yaw_deg.get()
    }

    /// Test tone switched on.
    pub fn tone_enabled(&self) -> bool {
        self.tone_enabled.load(Ordering::Acquire)
    }

    /// Test tone frequency in Hz.
    pub fn tone_frequency(&self) -> f32 {
        self.tone_hz.get()
    }

    /// Test tone level, 0..=1.
    pub fn tone_level(&self) -> f32 {
        self.tone_level.get()
    }
}

/// Sine oscillator for the preview test tone.
#[derive(Debug, Clone)]
pub struct TestTone {
    phase: f32,
    sample_rate: f32,
}

impl TestTone {
    /// Oscillator at phase 0.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            sample_rate,
        }
    }

    /// Next sample at `hz`, amplitude 1.
    #[inline]
    pub fn next_sample(&mut self, hz: f32) -> f32 {
        let out = (TAU * self.phase).sin();
        self.phase += hz / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        out
    }
}

struct PreviewIo {
    producer: rtrb::Producer<f32>,
    sample_rate_hz: u32,
    /// Set once the first block at another rate has been logged.
    rate_mismatch: bool,
    _stream: StreamHandle,
}

/// [`NativeChain`] implemented in Rust on top of an [`AudioBackend`].
pub struct SoftwareChain {
    backend: Mutex<Box<dyn AudioBackend>>,
    params: Arc<ChainParams>,
    /// Rate of the live chain, 0 while none exists.
    chain_rate: AtomicU32,
    preview: Mutex<Option<PreviewIo>>,
    dropped_samples: AtomicU64,
}

impl SoftwareChain {
    /// Chain whose preview path plays through `backend`.
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend: Mutex::new(backend),
            params: Arc::new(ChainParams::default()),
            chain_rate: AtomicU32::new(0),
            preview: Mutex::new(None),
            dropped_samples: AtomicU64::new(0),
        }
    }

    /// Shared parameter block.
    pub fn params(&self) -> &Arc<ChainParams> {
        &self.params
    }

    /// Whether `create_chain` has run without a matching `destroy_chain`.
    pub fn is_created(&self) -> bool {
        self.chain_rate.load(Ordering::Acquire) != 0
    }

    /// Whether the low-latency output stream is open.
    pub fn is_io_running(&self) -> bool {
        self.preview.lock().is_some()
    }

    /// Preview samples discarded because the ring was full or busy.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples.load(Ordering::Relaxed)
    }

    /// Whether the running preview stream has received a block at a rate
    /// other than its own. Cleared when the stream is reopened.
    pub fn preview_rate_mismatch(&self) -> bool {
        self.preview
            .lock()
            .as_ref()
            .is_some_and(|io| io.rate_mismatch)
    }

    fn ring_capacity(sample_rate_hz: u32, frames_per_callback: u32) -> usize {
        let half_second = (sample_rate_hz as f32 * PREVIEW_RING_SECONDS) as usize;
        half_second.max(frames_per_callback as usize * 8) * usize::from(STEREO)
    }
}

impl NativeChain for SoftwareChain {
    fn create_chain(&self, sample_rate_hz: u32) -> spatia_core::Result<()> {
        if sample_rate_hz == 0 {
            return Err(spatia_core::Error::InvalidSampleRate(sample_rate_hz));
        }
        self.chain_rate.store(sample_rate_hz, Ordering::Release);
        tracing::debug!(sample_rate = sample_rate_hz, "software chain created");
        Ok(())
    }

    fn destroy_chain(&self) {
        self.stop_low_latency_io();
        self.chain_rate.store(0, Ordering::Release);
        tracing::debug!("software chain destroyed");
    }

    fn set_eq_band(&self, band_index: u32, gain_db: f32) {
        match self.params.eq.get(band_index as usize) {
            Some(band) => band.set(gain_db),
            None => tracing::warn!(band = band_index, "EQ band out of range"),
        }
    }

    fn set_compressor(&self, params: CompressorParams) {
        self.params.threshold_db.set(params.threshold_db);
        self.params.ratio.set(params.ratio);
        self.params.attack_ms.set(params.attack_ms);
        self.params.release_ms.set(params.release_ms);
        self.params.makeup_db.set(params.makeup_db);
    }

    fn set_reverb(&self, params: ReverbParams) {
        self.params
            .reverb_enabled
            .store(params.enabled, Ordering::Release);
        self.params.reverb_wet.set(params.wet);
    }

    fn process_buffer(&self, mut buffer: NativeBufferHandle<'_>, frames: usize, _sample_rate_hz: u32) {
        if !self.is_created() {
            return;
        }
        let gain = db_to_linear(self.params.makeup_db.get());
        if gain == 1.0 {
            return;
        }
        let samples = buffer.as_mut_slice();
        let len = (frames * usize::from(STEREO)).min(samples.len());
        for s in &mut samples[..len] {
            *s *= gain;
        }
    }

    fn start_low_latency_io(
        &self,
        sample_rate_hz: u32,
        frames_per_callback: u32,
    ) -> spatia_core::Result<()> {
        if !self.is_created() {
            return Err(spatia_core::Error::native(
                "start_low_latency_io",
                "no chain has been created",
            ));
        }
        let mut preview = self.preview.lock();
        if preview.is_some() {
            return Ok(());
        }

        let capacity = Self::ring_capacity(sample_rate_hz, frames_per_callback);
        let (producer, mut consumer) = rtrb::RingBuffer::<f32>::new(capacity);
        let params = Arc::clone(&self.params);
        let mut tone = TestTone::new(sample_rate_hz as f32);

        let config = BackendStreamConfig {
            sample_rate: sample_rate_hz,
            buffer_size: frames_per_callback,
            channels: STEREO,
            device_name: None,
        };
        let stream = self.backend.lock().build_output_stream(
            &config,
            Box::new(move |out: &mut [f32]| {
                let frame_len = usize::from(STEREO);
                let ready = out.len().min(consumer.slots()) / frame_len * frame_len;
                let mut filled = 0;
                if let Ok(chunk) = consumer.read_chunk(ready) {
                    let (first, second) = chunk.as_slices();
                    out[..first.len()].copy_from_slice(first);
                    out[first.len()..ready].copy_from_slice(second);
                    chunk.commit_all();
                    filled = ready;
                }
                out[filled..].fill(0.0);
                if params.tone_enabled() {
                    let level = params.tone_level();
                    let hz = params.tone_frequency();
                    for frame in out.chunks_exact_mut(usize::from(STEREO)) {
                        let v = tone.next_sample(hz) * level;
                        for s in frame {
                            *s += v;
                        }
                    }
                }
            }),
            Box::new(|err: &str| tracing::warn!(error = err, "preview stream error")),
        )?;

        *preview = Some(PreviewIo {
            producer,
            sample_rate_hz,
            rate_mismatch: false,
            _stream: stream,
        });
        tracing::info!(
            sample_rate = sample_rate_hz,
            frames_per_callback,
            ring_samples = capacity,
            "software low-latency IO started"
        );
        Ok(())
    }

    fn stop_low_latency_io(&self) {
        if self.preview.lock().take().is_some() {
            tracing::info!("software low-latency IO stopped");
        }
    }

    fn enqueue_preview_pcm(&self, buffer: NativeBufferHandle<'_>, frames: usize, sample_rate_hz: u32) {
        let frame = usize::from(STEREO);
        let samples = buffer.as_slice();
        let len = (frames * frame).min(samples.len()) / frame * frame;

        // Never wait on the audio path; a busy lock means start/stop is in
        // progress and the block is dropped.
        let Some(mut preview) = self.preview.try_lock() else {
            self.dropped_samples.fetch_add(len as u64, Ordering::Relaxed);
            return;
        };
        let Some(io) = preview.as_mut() else {
            return;
        };

        if sample_rate_hz != io.sample_rate_hz && !io.rate_mismatch {
            io.rate_mismatch = true;
            tracing::warn!(
                block_rate = sample_rate_hz,
                stream_rate = io.sample_rate_hz,
                "preview block rate differs from stream rate; playing without resampling"
            );
        }

        // Whole frames only, committed in one step.
        let fit = len.min(io.producer.slots()) / frame * frame;
        if let Ok(chunk) = io.producer.write_chunk_uninit(fit) {
            chunk.fill_from_iter(samples[..fit].iter().copied());
        }
        let dropped = (len - fit) as u64;
        if dropped > 0 {
            self.dropped_samples.fetch_add(dropped, Ordering::Relaxed);
        }
    }

    fn set_head_tracking_enabled(&self, enabled: bool) {
        self.params.head_tracking.store(enabled, Ordering::Release);
    }

    fn set_head_tracking_yaw(&self, yaw_deg: f32) {
        self.params.yaw_deg.set(yaw_deg);
    }

    fn set_test_tone_enabled(&self, enabled: bool) {
        self.params.tone_enabled.store(enabled, Ordering::Release);
    }

    fn set_test_tone_frequency(&self, hz: f32) {
        self.params.tone_hz.set(hz);
    }

    fn set_test_tone_level(&self, level: f32) {
        self.params.tone_level.set(level);
    }
}

impl std::fmt::Debug for SoftwareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let io_rate = self.preview.lock().as_ref().map(|io| io.sample_rate_hz);
        f.debug_struct("SoftwareChain")
            .field("backend", &self.backend.lock().name())
            .field("chain_rate", &self.chain_rate.load(Ordering::Acquire))
            .field("io_rate", &io_rate)
            .finish_non_exhaustive()
    }
}
