//! Pipeline stage that adapts PCM to the native chain and routes it.
//!
//! [`FormatAdaptingProcessor`] sits inside a pull-based playback pipeline.
//! For every input buffer it:
//!
//! 1. consumes the whole frames available,
//! 2. stages them as interleaved `f32` (16-bit input is scaled by 1/32768),
//! 3. takes one routing decision from [`AudioGraph::route`],
//! 4. processes in place, forwards to preview and silences, or passes through,
//! 5. re-encodes 16-bit input with the asymmetric clamp.
//!
//! The result is drained with [`get_output`](FormatAdaptingProcessor::get_output).
//! Staging buffers grow to the largest block seen and are only released by
//! [`reset`](FormatAdaptingProcessor::reset), so steady-state processing does
//! not allocate.

use std::sync::Arc;

use crate::format::{AudioFormat, SampleEncoding};
use crate::graph::{AudioGraph, Route};
use crate::native::resolve_buffer_address;
use crate::param::AtomicParam;
use crate::pcm::{self, PcmBuffer};
use crate::Result;

/// Processed samples, in the negotiated encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputBuffer<'a> {
    /// Interleaved float samples.
    Float(&'a [f32]),
    /// Interleaved 16-bit samples.
    Int16(&'a [i16]),
}

impl OutputBuffer<'_> {
    /// Sample count (all channels).
    pub fn len(&self) -> usize {
        match self {
            OutputBuffer::Float(s) => s.len(),
            OutputBuffer::Int16(s) => s.len(),
        }
    }

    /// No samples pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Little-endian bytes, as a pipeline sink expects them.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            OutputBuffer::Float(s) => pcm::f32_to_le_bytes(s),
            OutputBuffer::Int16(s) => pcm::i16_to_le_bytes(s),
        }
    }
}

/// Format-adapting, routing pipeline stage.
pub struct FormatAdaptingProcessor {
    graph: Arc<AudioGraph>,
    format: Option<AudioFormat>,
    staging: Vec<f32>,
    encoded: Vec<i16>,
    /// Samples waiting in `staging`/`encoded`; 0 once drained.
    pending: usize,
    input_ended: bool,
    level: Arc<AtomicParam>,
}

impl FormatAdaptingProcessor {
    /// Create an unconfigured processor routed by `graph`.
    pub fn new(graph: Arc<AudioGraph>) -> Self {
        Self {
            graph,
            format: None,
            staging: Vec::new(),
            encoded: Vec::new(),
            pending: 0,
            input_ended: false,
            level: Arc::new(AtomicParam::new(0.0, 0.0, f32::MAX)),
        }
    }

    /// Negotiate the input format. The output format is identical.
    ///
    /// Anything but stereo `Float32`/`Int16` fails with
    /// [`Error::UnsupportedFormat`](crate::Error::UnsupportedFormat) and
    /// leaves the current configuration untouched.
    pub fn configure(&mut self, format: AudioFormat) -> Result<AudioFormat> {
        let format = format.validate()?;
        self.format = Some(format);
        self.pending = 0;
        self.input_ended = false;
        tracing::debug!(
            encoding = ?format.encoding,
            sample_rate = format.sample_rate_hz,
            "processor configured"
        );
        Ok(format)
    }

    /// A format has been negotiated.
    pub fn is_active(&self) -> bool {
        self.format.is_some()
    }

    /// Negotiated format.
    pub fn format(&self) -> Option<AudioFormat> {
        self.format
    }

    /// Ready for another input buffer (previous output drained).
    pub fn is_ready_for_input(&self) -> bool {
        self.pending == 0
    }

    /// Consume whole frames from `input`, route them and stage the output.
    ///
    /// Returns the number of frames consumed. A buffer holding less than one
    /// frame is marked consumed and produces nothing; a trailing partial
    /// frame is left in `input` for the next call. Nothing is consumed while
    /// the processor is inactive or previous output has not been drained.
    pub fn queue_input(&mut self, input: &mut PcmBuffer<'_>) -> usize {
        let Some(format) = self.format else {
            return 0;
        };
        if self.pending != 0 {
            return 0;
        }

        let bytes_per_frame = format.bytes_per_frame();
        let frames = input.remaining() / bytes_per_frame;
        if frames == 0 {
            input.consume_all();
            return 0;
        }

        let samples = frames * usize::from(format.channel_count);
        let bytes = &input.remaining_bytes()[..frames * bytes_per_frame];
        if self.staging.len() < samples {
            self.staging.resize(samples, 0.0);
        }
        match format.encoding {
            SampleEncoding::Int16 => pcm::decode_i16_le(bytes, &mut self.staging[..samples]),
            SampleEncoding::Float32 => pcm::decode_f32_le(bytes, &mut self.staging[..samples]),
        };
        input.advance(frames * bytes_per_frame);

        self.route_staged(format, frames, samples);

        if format.encoding == SampleEncoding::Int16 {
            if self.encoded.len() < samples {
                self.encoded.resize(samples, 0);
            }
            pcm::encode_i16(&self.staging[..samples], &mut self.encoded[..samples]);
        }

        self.level.set(pcm::rms(&self.staging[..samples]));
        self.pending = samples;
        frames
    }

    fn route_staged(&mut self, format: AudioFormat, frames: usize, samples: usize) {
        let ticket = self.graph.route();
        let staged = &mut self.staging[..samples];
        match ticket.route() {
            Route::Process => {
                if let Some(handle) = resolve_buffer_address(staged) {
                    ticket.process(handle, frames, format.sample_rate_hz);
                }
            }
            Route::Preview => {
                // Only stereo float reaches the preview path; anything else
                // keeps playing through the pipeline.
                if !format.is_stereo_f32() {
                    return;
                }
                if let Some(handle) = resolve_buffer_address(staged) {
                    if ticket.enqueue_preview(handle, frames, format.sample_rate_hz) {
                        staged.fill(0.0);
                    }
                }
            }
            Route::PassThrough => {}
        }
    }

    /// Take the pending output. Empty when nothing is pending.
    pub fn get_output(&mut self) -> OutputBuffer<'_> {
        let samples = std::mem::take(&mut self.pending);
        match self.format.map(|f| f.encoding) {
            Some(SampleEncoding::Int16) => OutputBuffer::Int16(&self.encoded[..samples]),
            _ => OutputBuffer::Float(&self.staging[..samples]),
        }
    }

    /// Signal that no more input will arrive.
    pub fn queue_end_of_stream(&mut self) {
        self.input_ended = true;
    }

    /// End of stream was queued and all output drained.
    pub fn is_ended(&self) -> bool {
        self.input_ended && self.pending == 0
    }

    /// Drop pending output and the end-of-stream mark. Format and capacity
    /// are kept.
    pub fn flush(&mut self) {
        self.pending = 0;
        self.input_ended = false;
    }

    /// Flush, forget the negotiated format and release staging capacity.
    pub fn reset(&mut self) {
        self.flush();
        self.format = None;
        self.staging = Vec::new();
        self.encoded = Vec::new();
        self.level.reset();
    }

    /// RMS of the most recent output block (linear).
    pub fn output_level(&self) -> f32 {
        self.level.get()
    }

    /// Shared handle to the output level, readable from another thread.
    pub fn level_meter(&self) -> Arc<AtomicParam> {
        Arc::clone(&self.level)
    }

    /// Current staging capacity in samples.
    pub fn staging_capacity(&self) -> usize {
        self.staging.len()
    }

    /// Address of the staging buffer, to check that processing happened in
    /// place.
    pub fn staging_address(&self) -> usize {
        self.staging.as_ptr() as usize
    }
}

impl std::fmt::Debug for FormatAdaptingProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatAdaptingProcessor")
            .field("format", &self.format)
            .field("pending", &self.pending)
            .field("input_ended", &self.input_ended)
            .finish_non_exhaustive()
    }
}
