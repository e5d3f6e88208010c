//! Location lookup plus forecast, resolved independently of the diagnosis.
//!
//! The gate only produces the forecast. Whether it is shown is decided by
//! the session, which opens the gate on a successful upload.

use cropdx_core::error::WeatherError;
use cropdx_core::weather::{
    Coordinates, LocationProvider, ResolvedForecast, WeatherProvider,
};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct WeatherGate {
    location: Arc<dyn LocationProvider>,
    weather: Arc<dyn WeatherProvider>,
}

impl WeatherGate {
    pub fn new(location: Arc<dyn LocationProvider>, weather: Arc<dyn WeatherProvider>) -> Self {
        Self { location, weather }
    }

    /// Fetches the forecast for `coordinates`, labelled with the provider's
    /// place name.
    pub async fn resolve_forecast(
        &self,
        coordinates: Coordinates,
    ) -> Result<ResolvedForecast, WeatherError> {
        let (forecast, provider_label) = self.weather.forecast(coordinates).await?;
        debug!(days = forecast.len(), "forecast resolved");
        Ok(ResolvedForecast {
            forecast,
            location_label: provider_label,
        })
    }

    /// Current device coordinates, when the location capability provides them.
    pub async fn locate(&self) -> Result<(Coordinates, Option<String>), WeatherError> {
        let location = self.location.current_location().await?;
        Ok((location.coordinates, location.place_name))
    }

    /// Locates the device and resolves its forecast.
    ///
    /// The device's own place name wins over the provider's. Coordinates are
    /// returned even when the forecast fails, so a later refresh can tell
    /// whether the device moved.
    pub async fn locate_and_resolve(
        &self,
    ) -> (Option<Coordinates>, Result<ResolvedForecast, WeatherError>) {
        let (coordinates, place_name) = match self.locate().await {
            Ok(found) => found,
            Err(err) => {
                warn!(error = %err, "location unavailable, weather will not be shown");
                return (None, Err(err));
            }
        };

        let result = self
            .resolve_forecast(coordinates)
            .await
            .map(|mut resolved| {
                if place_name.is_some() {
                    resolved.location_label = place_name;
                }
                resolved
            });
        if let Err(err) = &result {
            warn!(error = %err, "weather fetch failed");
        }

        (Some(coordinates), result)
    }
}
