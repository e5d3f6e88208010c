//! Infrastructure layer for CropDx: configuration file discovery and loading.

pub mod config_service;
pub mod paths;

pub use config_service::ConfigService;
pub use paths::{CONFIG_DIR_ENV, CropDxPaths};
