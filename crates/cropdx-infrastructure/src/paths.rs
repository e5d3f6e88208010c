//! Path management for cropdx configuration files.

use cropdx_core::error::{CropDxError, Result};
use std::path::PathBuf;

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "CROPDX_CONFIG_DIR";

/// Path management for cropdx.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/cropdx/            # Config directory
/// └── config.toml              # Service endpoints and workflow variant
/// ```
pub struct CropDxPaths;

impl CropDxPaths {
    /// Returns the cropdx configuration directory.
    ///
    /// `CROPDX_CONFIG_DIR` wins when set; otherwise `~/.config/cropdx` on
    /// every platform.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory
    /// - `Err(CropDxError::Config)`: Home directory could not be determined
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|dir| !dir.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        dirs::home_dir()
            .map(|home| home.join(".config").join("cropdx"))
            .ok_or_else(|| CropDxError::config("Cannot find home directory"))
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}
