//! Workflow variants and service endpoints.
//!
//! The same workflow backs every screen variant; the differences between them
//! are captured here as flags instead of separate code paths.

use serde::{Deserialize, Serialize};

/// Score threshold sent with every inference request unless overridden.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.25;

/// Number of forecast days requested from the weather provider.
pub const DEFAULT_FORECAST_DAYS: u8 = 14;

/// Value a crop picker reports before the user chose anything.
pub const UNSELECTED_CROP: &str = "unselected";

/// Flags describing one variant of the diagnosis screen.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Capture is refused until a crop has been selected.
    pub require_crop_selection: bool,
    /// When non-empty, only these crops are accepted by `select_crop`.
    pub crop_options: Vec<String>,
    /// Crop used for advisory lookups when none was selected.
    pub default_crop: Option<String>,
    /// Request treatment advice for every detected label.
    pub fetch_advice: bool,
    /// Fetch a forecast at session start and reveal it after a detection.
    pub weather_enabled: bool,
    pub score_threshold: f32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::detector()
    }
}

impl WorkflowConfig {
    /// Plain detector screen: pick or shoot, upload, show detections.
    pub fn detector() -> Self {
        Self {
            require_crop_selection: false,
            crop_options: Vec::new(),
            default_crop: None,
            fetch_advice: false,
            weather_enabled: false,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }

    /// Field assistant screen: crop selection, treatment advice and a
    /// forecast revealed once a detection pass succeeded.
    pub fn field_assistant(crop_options: Vec<String>) -> Self {
        Self {
            require_crop_selection: true,
            crop_options,
            default_crop: None,
            fetch_advice: true,
            weather_enabled: true,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }
}

/// Inference service endpoint.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct InferenceConfig {
    pub base_url: String,
    /// Per-request timeout. Absent means wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Treatment advisory service endpoint.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AdvisoryConfig {
    pub base_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Weather provider access.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct WeatherConfig {
    pub api_key: String,
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    #[serde(default = "default_forecast_days")]
    pub days: u8,
}

fn default_weather_base_url() -> String {
    "https://api.weatherapi.com/v1".to_string()
}

fn default_forecast_days() -> u8 {
    DEFAULT_FORECAST_DAYS
}

/// Fixed device position, for hosts without a location capability.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub label: Option<String>,
}

/// Root configuration structure for config.toml
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub inference: InferenceConfig,
    #[serde(default)]
    pub advisory: Option<AdvisoryConfig>,
    #[serde(default)]
    pub weather: Option<WeatherConfig>,
    #[serde(default)]
    pub location: Option<LocationConfig>,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}
