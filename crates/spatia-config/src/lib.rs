//! Engine configuration for spatia.
//!
//! A single TOML file holds the settings a host applies at startup: the
//! fallback output rate and preview buffer size, the DSP chain parameters,
//! the spatialization switches and the test tone.
//!
//! # Features
//!
//! - **Load/save**: [`EngineConfig::load`], [`EngineConfig::save`],
//!   [`EngineConfig::load_or_default`]
//! - **Validation**: every field is range-checked, all problems reported
//!   together
//! - **Paths**: platform-specific config directory
//! - **Apply**: push the DSP and spatial sections into an
//!   [`AudioGraph`](spatia_core::AudioGraph)
//!
//! # Example
//!
//! ```rust,no_run
//! use spatia_config::{EngineConfig, paths};
//!
//! let config = EngineConfig::load_or_default(paths::default_config_path()).unwrap();
//! config.validate().unwrap();
//! ```

mod engine_config;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

/// Range checks for engine configs.
pub mod validation;

pub use engine_config::{
    AudioSection, CompressorSection, DspSection, EngineConfig, MAX_EQ_BANDS, ReverbSection,
    SpatialSection, TestToneSection,
};
pub use error::ConfigError;
pub use paths::{default_config_path, ensure_user_config_dir, user_config_dir};
pub use validation::{ValidationError, ValidationResult, validate_engine_config};
