//! StaticLocation - a fixed position for hosts without a location capability.

use async_trait::async_trait;
use cropdx_core::config::LocationConfig;
use cropdx_core::error::WeatherError;
use cropdx_core::weather::{Coordinates, DeviceLocation, LocationProvider};

/// Always reports the configured coordinates.
#[derive(Debug, Clone)]
pub struct StaticLocation {
    location: DeviceLocation,
}

impl StaticLocation {
    pub fn new(coordinates: Coordinates, place_name: Option<String>) -> Self {
        Self {
            location: DeviceLocation {
                coordinates,
                place_name,
            },
        }
    }
}

impl From<&LocationConfig> for StaticLocation {
    fn from(config: &LocationConfig) -> Self {
        Self::new(
            Coordinates::new(config.latitude, config.longitude),
            config.label.clone(),
        )
    }
}

#[async_trait]
impl LocationProvider for StaticLocation {
    async fn current_location(&self) -> Result<DeviceLocation, WeatherError> {
        Ok(self.location.clone())
    }
}
