//! Audio format descriptors negotiated between the pipeline and the processor.

use crate::{Error, Result};

/// Number of channels the routing engine accepts.
pub const STEREO: u16 = 2;

/// Sample rate assumed when the output device cannot report one.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 48000;

/// PCM sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleEncoding {
    /// 32-bit IEEE 754 float, nominal range [-1.0, 1.0].
    Float32,
    /// 16-bit signed integer.
    Int16,
}

impl SampleEncoding {
    /// Size of one sample in bytes.
    #[inline]
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleEncoding::Float32 => 4,
            SampleEncoding::Int16 => 2,
        }
    }
}

/// Interleaved PCM format: encoding, channel count and sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    /// Sample encoding.
    pub encoding: SampleEncoding,
    /// Number of interleaved channels.
    pub channel_count: u16,
    /// Sample rate in Hz.
    pub sample_rate_hz: u32,
}

impl AudioFormat {
    /// Create a new format descriptor.
    pub const fn new(encoding: SampleEncoding, channel_count: u16, sample_rate_hz: u32) -> Self {
        Self {
            encoding,
            channel_count,
            sample_rate_hz,
        }
    }

    /// Stereo float format at the given rate.
    pub const fn stereo_f32(sample_rate_hz: u32) -> Self {
        Self::new(SampleEncoding::Float32, STEREO, sample_rate_hz)
    }

    /// Stereo 16-bit format at the given rate.
    pub const fn stereo_i16(sample_rate_hz: u32) -> Self {
        Self::new(SampleEncoding::Int16, STEREO, sample_rate_hz)
    }

    /// Bytes occupied by one interleaved frame.
    #[inline]
    pub const fn bytes_per_frame(&self) -> usize {
        self.channel_count as usize * self.encoding.bytes_per_sample()
    }

    /// Whether this is interleaved stereo float, the only layout the
    /// low-latency preview path accepts.
    #[inline]
    pub fn is_stereo_f32(&self) -> bool {
        self.encoding == SampleEncoding::Float32 && self.channel_count == STEREO
    }

    /// Check the stereo-only contract.
    ///
    /// Returns the format unchanged when it is stereo `Float32`/`Int16` with a
    /// non-zero rate, otherwise [`Error::UnsupportedFormat`].
    pub fn validate(self) -> Result<Self> {
        if self.channel_count != STEREO || self.sample_rate_hz == 0 {
            return Err(Error::UnsupportedFormat {
                encoding: self.encoding,
                channel_count: self.channel_count,
                sample_rate_hz: self.sample_rate_hz,
            });
        }
        Ok(self)
    }
}
