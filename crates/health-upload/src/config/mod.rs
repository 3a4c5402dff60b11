mod settings;

pub use settings::{Settings, SettingsOverrides};

use crate::error::{HealthError, Result};
use std::path::{Path, PathBuf};

/// Default configuration directory name
const CONFIG_DIR_NAME: &str = "health-upload";

/// Settings file name inside the config directory
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Get the configuration directory path
/// Returns ~/.config/health-upload on Unix, ~/Library/Application Support/health-upload on macOS
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join(CONFIG_DIR_NAME))
        .ok_or_else(|| HealthError::config("Could not determine config directory"))
}

/// Get the data directory path for the local document store
/// Returns ~/.local/share/health-upload on Unix, ~/Library/Application Support/health-upload on macOS
pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join(CONFIG_DIR_NAME))
        .ok_or_else(|| HealthError::config("Could not determine data directory"))
}

/// Default location of the settings file
pub fn settings_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(SETTINGS_FILE_NAME))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
