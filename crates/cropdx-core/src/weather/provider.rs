use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::model::{Coordinates, Forecast};
use crate::error::WeatherError;

/// Device position with an optional human-readable place name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceLocation {
    pub coordinates: Coordinates,
    pub place_name: Option<String>,
}

/// Location and geocoding capability of the host.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Asks for permission if needed and returns the current position.
    async fn current_location(&self) -> Result<DeviceLocation, WeatherError>;
}

/// Daily forecast lookup by coordinates.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Returns the forecast and, when the provider knows it, the place name.
    async fn forecast(
        &self,
        coordinates: Coordinates,
    ) -> Result<(Forecast, Option<String>), WeatherError>;
}
