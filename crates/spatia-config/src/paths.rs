//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/spatia/engine.toml`
//! - macOS: `~/Library/Application Support/spatia/engine.toml`
//! - Windows: `%APPDATA%\spatia\engine.toml`
//!
//! ```rust,no_run
//! use spatia_config::paths;
//!
//! let path = paths::default_config_path();
//! println!("engine config: {}", path.display());
//! ```

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "spatia";

/// File name of the engine config.
pub const CONFIG_FILE_NAME: &str = "engine.toml";

/// Returns the user-specific configuration directory.
///
/// Falls back to `./spatia` if the platform config directory cannot be
/// determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the engine config file.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE_NAME)
}

/// `explicit` if given, the default config path otherwise.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(default_config_path, Path::to_path_buf)
}

/// Ensure the user config directory exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_user_config_dir() -> Result<PathBuf, crate::ConfigError> {
    let dir = user_config_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| crate::ConfigError::create_dir(&dir, e))?;
        tracing::info!(path = %dir.display(), "created config directory");
    }

    Ok(dir)
}
