//! WAV file reading and writing for offline processing.
//!
//! The engine works on interleaved stereo, so files are read into and
//! written from interleaved `[L0, R0, L1, R1, ...]` buffers. Mono files are
//! duplicated to both channels; wider layouts are rejected. Two encodings
//! are supported, matching the formats the processor accepts: 16-bit PCM and
//! 32-bit float.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavWriter};
use spatia_core::pcm::{f32_to_i16, i16_to_f32};
use spatia_core::{AudioFormat, STEREO, SampleEncoding};

use crate::{Error, Result};

/// Sample encoding of a supported WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavEncoding {
    /// 16-bit signed integer PCM.
    Int16,
    /// 32-bit IEEE 754 float.
    Float32,
}

impl WavEncoding {
    /// Bits per sample on disk.
    pub const fn bits_per_sample(self) -> u16 {
        match self {
            WavEncoding::Int16 => 16,
            WavEncoding::Float32 => 32,
        }
    }

    fn from_spec(spec: hound::WavSpec) -> Option<Self> {
        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 16) => Some(WavEncoding::Int16),
            (SampleFormat::Float, 32) => Some(WavEncoding::Float32),
            _ => None,
        }
    }
}

impl From<WavEncoding> for SampleEncoding {
    fn from(encoding: WavEncoding) -> Self {
        match encoding {
            WavEncoding::Int16 => SampleEncoding::Int16,
            WavEncoding::Float32 => SampleEncoding::Float32,
        }
    }
}

/// WAV header summary, read without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Channels in the file.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Encoding, `None` if the file uses one this crate cannot read.
    pub encoding: Option<WavEncoding>,
    /// Frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl WavInfo {
    fn from_reader<R: std::io::Read>(reader: &WavReader<R>) -> Self {
        let spec = reader.spec();
        let num_frames = u64::from(reader.duration());
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            encoding: WavEncoding::from_spec(spec),
            num_frames,
            duration_secs: num_frames as f64 / f64::from(spec.sample_rate.max(1)),
        }
    }

    /// Stereo format the file decodes to, or `None` for unsupported files.
    pub fn stereo_format(&self) -> Option<AudioFormat> {
        let encoding = self.encoding?;
        if self.channels == 0 || self.channels > STEREO {
            return None;
        }
        Some(AudioFormat::new(encoding.into(), STEREO, self.sample_rate))
    }
}

/// Read the header of a WAV file.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    Ok(WavInfo::from_reader(&reader))
}

/// Read a WAV file as interleaved stereo `f32`.
///
/// 16-bit samples are scaled by 1/32768. Mono is duplicated to both
/// channels.
///
/// # Errors
///
/// [`Error::UnsupportedLayout`] for files with more than two channels or an
/// encoding other than 16-bit PCM / 32-bit float.
pub fn read_wav_interleaved<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavInfo)> {
    let reader = WavReader::open(path)?;
    let info = WavInfo::from_reader(&reader);

    let Some(encoding) = info.encoding else {
        return Err(Error::UnsupportedLayout(format!(
            "{}-bit {:?} samples",
            info.bits_per_sample,
            reader.spec().sample_format
        )));
    };
    if info.channels == 0 || info.channels > STEREO {
        return Err(Error::UnsupportedLayout(format!(
            "{} channels (expected mono or stereo)",
            info.channels
        )));
    }

    let samples: Vec<f32> = match encoding {
        WavEncoding::Float32 => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        WavEncoding::Int16 => reader
            .into_samples::<i16>()
            .map(|s| s.map(i16_to_f32))
            .collect::<std::result::Result<_, _>>()?,
    };

    let interleaved = if info.channels == 1 {
        samples.iter().flat_map(|&s| [s, s]).collect()
    } else {
        samples
    };

    tracing::debug!(
        frames = info.num_frames,
        sample_rate = info.sample_rate,
        channels = info.channels,
        "read WAV"
    );
    Ok((interleaved, info))
}

/// Write interleaved stereo `f32` samples to a WAV file.
///
/// For [`WavEncoding::Int16`] samples are clamped to the 16-bit range the
/// same way the processor's integer output is.
///
/// # Errors
///
/// [`Error::UnsupportedLayout`] if `samples` is not a whole number of stereo
/// frames.
pub fn write_wav_interleaved<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
    encoding: WavEncoding,
) -> Result<()> {
    if samples.len() % usize::from(STEREO) != 0 {
        return Err(Error::UnsupportedLayout(format!(
            "{} samples is not a whole number of stereo frames",
            samples.len()
        )));
    }

    let spec = hound::WavSpec {
        channels: STEREO,
        sample_rate,
        bits_per_sample: encoding.bits_per_sample(),
        sample_format: match encoding {
            WavEncoding::Int16 => SampleFormat::Int,
            WavEncoding::Float32 => SampleFormat::Float,
        },
    };
    let mut writer = WavWriter::create(path, spec)?;
    match encoding {
        WavEncoding::Float32 => {
            for &s in samples {
                writer.write_sample(s)?;
            }
        }
        WavEncoding::Int16 => {
            for &s in samples {
                writer.write_sample(f32_to_i16(s))?;
            }
        }
    }
    writer.finalize()?;
    Ok(())
}
