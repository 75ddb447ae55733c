//! Interleaved PCM buffers and fixed/float sample conversion.
//!
//! The pipeline hands the processor little-endian interleaved bytes. Samples
//! are staged as `f32` for native processing and, for 16-bit input,
//! re-encoded afterwards.
//!
//! # Conversion rule
//!
//! - decode: `sample / 32768.0`
//! - encode: clamp to `[-1.0, I16_MAX_AS_F32]`, scale by 32768, round
//!
//! The upper clamp bound is `32767 / 32768`, so a full-scale positive float
//! encodes to `32767` instead of wrapping to `-32768`. Every `i16` value
//! survives a decode/encode round trip unchanged.

/// Scale between 16-bit integer and float samples.
pub const I16_SCALE: f32 = 32768.0;

/// Largest float that encodes without overflowing `i16` (`32767 / 32768`).
pub const I16_MAX_AS_F32: f32 = 0.999_969_482_421_875;

/// Convert one 16-bit sample to float.
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / I16_SCALE
}

/// Convert one float sample to 16-bit with the asymmetric clamp.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, I16_MAX_AS_F32) * I16_SCALE).round() as i16
}

/// Decode little-endian 16-bit samples into `out`.
///
/// Converts `min(bytes.len() / 2, out.len())` samples and returns the count.
pub fn decode_i16_le(bytes: &[u8], out: &mut [f32]) -> usize {
    let count = (bytes.len() / 2).min(out.len());
    for (dst, chunk) in out[..count].iter_mut().zip(bytes.chunks_exact(2)) {
        *dst = i16_to_f32(i16::from_le_bytes([chunk[0], chunk[1]]));
    }
    count
}

/// Copy little-endian 32-bit float samples into `out` bit-for-bit.
///
/// Copies `min(bytes.len() / 4, out.len())` samples and returns the count.
pub fn decode_f32_le(bytes: &[u8], out: &mut [f32]) -> usize {
    let count = (bytes.len() / 4).min(out.len());
    for (dst, chunk) in out[..count].iter_mut().zip(bytes.chunks_exact(4)) {
        *dst = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    count
}

/// Encode float samples into 16-bit samples.
pub fn encode_i16(samples: &[f32], out: &mut [i16]) {
    debug_assert!(out.len() >= samples.len());
    for (dst, &src) in out.iter_mut().zip(samples) {
        *dst = f32_to_i16(src);
    }
}

/// Root-mean-square level of a block (0.0 for an empty block).
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Read cursor over an externally owned, interleaved PCM byte block.
///
/// The processor reads from the block in place and advances the cursor by
/// what it consumed. The bytes are never copied out of the block except into
/// the processor's own staging buffer.
#[derive(Debug)]
pub struct PcmBuffer<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> PcmBuffer<'a> {
    /// Wrap a byte block with the cursor at its start.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current read position in bytes.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total size of the block in bytes.
    #[inline]
    pub fn limit(&self) -> usize {
        self.data.len()
    }

    /// Bytes between the cursor and the end of the block.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Whether unread bytes remain.
    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// The unread part of the block.
    #[inline]
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    /// Advance the cursor by `bytes`, saturating at the end of the block.
    #[inline]
    pub fn advance(&mut self, bytes: usize) {
        self.position = (self.position + bytes).min(self.data.len());
    }

    /// Mark the whole block as consumed.
    #[inline]
    pub fn consume_all(&mut self) {
        self.position = self.data.len();
    }
}

/// Serialize interleaved float samples as little-endian bytes.
pub fn f32_to_le_bytes(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Serialize interleaved 16-bit samples as little-endian bytes.
pub fn i16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
