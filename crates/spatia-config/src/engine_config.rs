//! Engine configuration file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use spatia_core::{AudioGraph, CompressorParams, DEFAULT_SAMPLE_RATE_HZ, ReverbParams};

use crate::error::ConfigError;
use crate::validation::{ValidationResult, validate_engine_config};

/// Bands the chain's equalizer exposes.
pub const MAX_EQ_BANDS: usize = 10;

/// Engine settings stored as TOML.
///
/// Every section and field is optional in the file; missing values take
/// their defaults.
///
/// # TOML Format
///
/// ```toml
/// [audio]
/// fallback_sample_rate = 48000
/// preview_frames_per_callback = 256
/// output_device = "USB"
///
/// [dsp]
/// eq_bands = [3.0, 1.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0, -2.0]
///
/// [dsp.compressor]
/// threshold_db = -18.0
/// ratio = 3.0
/// attack_ms = 10.0
/// release_ms = 120.0
/// makeup_db = 2.0
///
/// [dsp.reverb]
/// enabled = true
/// wet = 0.25
///
/// [spatial]
/// spatial_enabled = true
/// head_tracking_enabled = true
/// keep_in_background = false
///
/// [test_tone]
/// frequency_hz = 440.0
/// level = 0.2
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Output device and preview stream settings.
    pub audio: AudioSection,
    /// Chain parameters.
    pub dsp: DspSection,
    /// Spatialization policy inputs.
    pub spatial: SpatialSection,
    /// Diagnostic test tone.
    pub test_tone: TestToneSection,
}

/// `[audio]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioSection {
    /// Rate used when the output device does not report one.
    pub fallback_sample_rate: u32,
    /// Callback size of the low-latency preview stream.
    pub preview_frames_per_callback: u32,
    /// Case-insensitive substring of the output device name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
}

impl Default for AudioSection {
    fn default() -> Self {
        Self {
            fallback_sample_rate: DEFAULT_SAMPLE_RATE_HZ,
            preview_frames_per_callback: 256,
            output_device: None,
        }
    }
}

/// `[dsp]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DspSection {
    /// Gain per EQ band in dB, lowest band first.
    pub eq_bands: Vec<f32>,
    /// `[dsp.compressor]`
    pub compressor: CompressorSection,
    /// `[dsp.reverb]`
    pub reverb: ReverbSection,
}

/// `[dsp.compressor]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompressorSection {
    /// Threshold in dBFS.
    pub threshold_db: f32,
    /// Ratio (N:1).
    pub ratio: f32,
    /// Attack in ms.
    pub attack_ms: f32,
    /// Release in ms.
    pub release_ms: f32,
    /// Makeup gain in dB.
    pub makeup_db: f32,
}

impl Default for CompressorSection {
    fn default() -> Self {
        CompressorParams::default().into()
    }
}

impl From<CompressorParams> for CompressorSection {
    fn from(p: CompressorParams) -> Self {
        Self {
            threshold_db: p.threshold_db,
            ratio: p.ratio,
            attack_ms: p.attack_ms,
            release_ms: p.release_ms,
            makeup_db: p.makeup_db,
        }
    }
}

impl From<CompressorSection> for CompressorParams {
    fn from(s: CompressorSection) -> Self {
        Self {
            threshold_db: s.threshold_db,
            ratio: s.ratio,
            attack_ms: s.attack_ms,
            release_ms: s.release_ms,
            makeup_db: s.makeup_db,
        }
    }
}

/// `[dsp.reverb]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReverbSection {
    /// Reverb engaged.
    pub enabled: bool,
    /// Wet mix, 0..=1.
    pub wet: f32,
}

impl Default for ReverbSection {
    fn default() -> Self {
        let p = ReverbParams::default();
        Self {
            enabled: p.enabled,
            wet: p.wet,
        }
    }
}

impl From<ReverbSection> for ReverbParams {
    fn from(s: ReverbSection) -> Self {
        Self {
            enabled: s.enabled,
            wet: s.wet,
        }
    }
}

/// `[spatial]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpatialSection {
    /// Spatial rendering requested.
    pub spatial_enabled: bool,
    /// Head tracking requested.
    pub head_tracking_enabled: bool,
    /// Keep tracking while in the background.
    pub keep_in_background: bool,
}

impl Default for SpatialSection {
    fn default() -> Self {
        Self {
            spatial_enabled: true,
            head_tracking_enabled: false,
            keep_in_background: false,
        }
    }
}

/// `[test_tone]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TestToneSection {
    /// Tone on at startup.
    pub enabled: bool,
    /// Frequency in Hz.
    pub frequency_hz: f32,
    /// Level, 0..=1.
    pub level: f32,
}

impl Default for TestToneSection {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency_hz: 440.0,
            level: 0.2,
        }
    }
}

impl EngineConfig {
    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise. A file that exists but
    /// does not parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.is_file() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no engine config, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::create_dir(parent, e))?;
            }
        }
        std::fs::write(path, self.to_toml()?).map_err(|e| ConfigError::write_file(path, e))?;
        tracing::info!(path = %path.display(), "engine config saved");
        Ok(())
    }

    /// Check every field against its legal range.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_engine_config(self)
    }

    /// Compressor section as chain parameters.
    pub fn compressor_params(&self) -> CompressorParams {
        self.dsp.compressor.into()
    }

    /// Reverb section as chain parameters.
    pub fn reverb_params(&self) -> ReverbParams {
        self.dsp.reverb.into()
    }

    /// Push EQ, compressor, reverb and test tone settings to the chain.
    ///
    /// Bands beyond [`MAX_EQ_BANDS`] are ignored.
    pub fn apply_dsp(&self, graph: &AudioGraph) {
        let dsp = graph.dsp();
        for (band, &gain) in self.dsp.eq_bands.iter().take(MAX_EQ_BANDS).enumerate() {
            dsp.set_eq_band(band as u32, gain);
        }
        dsp.set_compressor(self.compressor_params());
        dsp.set_reverb(self.reverb_params());
        dsp.set_test_tone_frequency(self.test_tone.frequency_hz);
        dsp.set_test_tone_level(self.test_tone.level);
        dsp.set_test_tone_enabled(self.test_tone.enabled);
        tracing::debug!(eq_bands = self.dsp.eq_bands.len(), "dsp config applied");
    }

    /// Feed the `[spatial]` switches into the graph's policy.
    pub fn apply_spatial(&self, graph: &AudioGraph) {
        graph.set_spatial_enabled(self.spatial.spatial_enabled);
        graph.set_head_tracking_enabled(self.spatial.head_tracking_enabled);
        graph.set_keep_in_background(self.spatial.keep_in_background);
    }
}
