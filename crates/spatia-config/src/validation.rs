//! Engine configuration validation.
//!
//! Every numeric field has a fixed legal range. [`validate_engine_config`]
//! checks them all and reports every problem at once, so a user editing the
//! TOML file sees the full list instead of fixing one error per run.
//!
//! # Example
//!
//! ```rust
//! use spatia_config::{EngineConfig, validate_engine_config};
//!
//! let mut config = EngineConfig::default();
//! assert!(validate_engine_config(&config).is_ok());
//!
//! config.dsp.reverb.wet = 1.5;
//! assert!(validate_engine_config(&config).is_err());
//! ```

use std::ops::RangeInclusive;

use thiserror::Error;

use crate::engine_config::{EngineConfig, MAX_EQ_BANDS};

/// Legal sample rates for the fallback output rate.
pub const SAMPLE_RATE_RANGE: RangeInclusive<u32> = 8_000..=384_000;
/// Legal preview callback sizes in frames.
pub const FRAMES_PER_CALLBACK_RANGE: RangeInclusive<u32> = 16..=8_192;
/// EQ band gain in dB.
pub const EQ_GAIN_RANGE: RangeInclusive<f32> = -24.0..=24.0;
/// Compressor threshold in dBFS.
pub const THRESHOLD_RANGE: RangeInclusive<f32> = -60.0..=0.0;
/// Compressor ratio.
pub const RATIO_RANGE: RangeInclusive<f32> = 1.0..=20.0;
/// Compressor attack in ms.
pub const ATTACK_RANGE: RangeInclusive<f32> = 0.1..=500.0;
/// Compressor release in ms.
pub const RELEASE_RANGE: RangeInclusive<f32> = 1.0..=5_000.0;
/// Makeup gain in dB.
pub const MAKEUP_RANGE: RangeInclusive<f32> = -24.0..=24.0;
/// Unit range for mixes and levels.
pub const UNIT_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Test tone frequency in Hz.
pub const TONE_FREQUENCY_RANGE: RangeInclusive<f32> = 20.0..=20_000.0;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Value outside its legal range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted field path, e.g. `dsp.reverb.wet`.
        field: String,
        /// Offending value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// More EQ bands than the chain has.
    #[error("{count} EQ bands configured, at most {max} supported")]
    TooManyBands {
        /// Bands in the file.
        count: usize,
        /// Bands the chain supports.
        max: usize,
    },

    /// NaN or infinite value.
    #[error("'{0}' is not a finite number")]
    NotFinite(String),

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn check_f32(
    errors: &mut Vec<ValidationError>,
    field: &str,
    value: f32,
    range: &RangeInclusive<f32>,
) {
    if !value.is_finite() {
        errors.push(ValidationError::NotFinite(field.to_string()));
    } else if !range.contains(&value) {
        errors.push(ValidationError::OutOfRange {
            field: field.to_string(),
            value: f64::from(value),
            min: f64::from(*range.start()),
            max: f64::from(*range.end()),
        });
    }
}

fn check_u32(
    errors: &mut Vec<ValidationError>,
    field: &str,
    value: u32,
    range: &RangeInclusive<u32>,
) {
    if !range.contains(&value) {
        errors.push(ValidationError::OutOfRange {
            field: field.to_string(),
            value: f64::from(value),
            min: f64::from(*range.start()),
            max: f64::from(*range.end()),
        });
    }
}

/// Check every field of `config`.
///
/// A single problem is returned as itself; several are wrapped in
/// [`ValidationError::Multiple`].
pub fn validate_engine_config(config: &EngineConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();

    check_u32(
        &mut errors,
        "audio.fallback_sample_rate",
        config.audio.fallback_sample_rate,
        &SAMPLE_RATE_RANGE,
    );
    check_u32(
        &mut errors,
        "audio.preview_frames_per_callback",
        config.audio.preview_frames_per_callback,
        &FRAMES_PER_CALLBACK_RANGE,
    );

    if config.dsp.eq_bands.len() > MAX_EQ_BANDS {
        errors.push(ValidationError::TooManyBands {
            count: config.dsp.eq_bands.len(),
            max: MAX_EQ_BANDS,
        });
    }
    for (i, &gain) in config.dsp.eq_bands.iter().enumerate() {
        check_f32(&mut errors, &format!("dsp.eq_bands[{i}]"), gain, &EQ_GAIN_RANGE);
    }

    let comp = &config.dsp.compressor;
    check_f32(&mut errors, "dsp.compressor.threshold_db", comp.threshold_db, &THRESHOLD_RANGE);
    check_f32(&mut errors, "dsp.compressor.ratio", comp.ratio, &RATIO_RANGE);
    check_f32(&mut errors, "dsp.compressor.attack_ms", comp.attack_ms, &ATTACK_RANGE);
    check_f32(&mut errors, "dsp.compressor.release_ms", comp.release_ms, &RELEASE_RANGE);
    check_f32(&mut errors, "dsp.compressor.makeup_db", comp.makeup_db, &MAKEUP_RANGE);

    check_f32(&mut errors, "dsp.reverb.wet", config.dsp.reverb.wet, &UNIT_RANGE);

    check_f32(
        &mut errors,
        "test_tone.frequency_hz",
        config.test_tone.frequency_hz,
        &TONE_FREQUENCY_RANGE,
    );
    check_f32(&mut errors, "test_tone.level", config.test_tone.level, &UNIT_RANGE);

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.swap_remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
