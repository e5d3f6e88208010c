//! Configuration service implementation.
//!
//! Loads the service configuration from `~/.config/cropdx/config.toml` (or an
//! explicit path) and caches it.

use crate::paths::CropDxPaths;
use cropdx_core::config::ServiceConfig;
use cropdx_core::error::{CropDxError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Configuration service that loads and caches the service configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    /// Explicit file location; `None` resolves through `CropDxPaths`.
    path: Option<PathBuf>,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<ServiceConfig>>>,
}

impl ConfigService {
    /// Creates a service reading the default configuration file.
    ///
    /// Nothing is read until the first `load`.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service reading `path` instead of the default location.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// # Returns
    ///
    /// - `Ok(ServiceConfig)`: the cached or freshly parsed configuration
    /// - `Err(CropDxError::Config)`: the file does not exist
    /// - `Err(CropDxError::Io | Serialization)`: it could not be read or parsed
    pub fn load(&self) -> Result<ServiceConfig> {
        {
            let cached = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let path = self.config_path()?;
        let loaded = Self::read_file(&path)?;
        info!(path = %path.display(), "configuration loaded");

        let mut cached = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *cached = Some(loaded.clone());
        Ok(loaded)
    }

    /// Writes `config` to the configuration file and replaces the cache.
    pub fn save(&self, config: &ServiceConfig) -> Result<()> {
        let path = self.config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)
            .map_err(|e| CropDxError::serialization("TOML", e.to_string()))?;
        std::fs::write(&path, content)?;
        debug!(path = %path.display(), "configuration saved");

        let mut cached = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *cached = Some(config.clone());
        Ok(())
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut cached = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *cached = None;
    }

    /// The file this service reads.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => CropDxPaths::config_file(),
        }
    }

    fn read_file(path: &Path) -> Result<ServiceConfig> {
        if !path.exists() {
            return Err(CropDxError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
