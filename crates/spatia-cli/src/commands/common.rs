//! Shared CLI helpers used across multiple commands.

use std::path::Path;

use spatia_config::{EngineConfig, paths};

/// Load the engine config from `explicit` or the default location and
/// validate it. A missing file yields the defaults.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let path = paths::resolve_config_path(explicit);
    let config = EngineConfig::load_or_default(&path)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
    Ok(config)
}

/// Largest absolute sample value.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
}
