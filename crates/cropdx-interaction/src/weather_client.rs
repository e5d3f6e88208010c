//! WeatherApiClient - daily forecast from weatherapi.com.

use async_trait::async_trait;
use chrono::NaiveDate;
use cropdx_core::config::WeatherConfig;
use cropdx_core::error::WeatherError;
use cropdx_core::weather::{Coordinates, DayForecast, Forecast, WeatherProvider};
use reqwest::Client;
use serde::Deserialize;

use crate::inference_client::trim_base_url;

/// Forecast provider backed by the weatherapi.com `forecast.json` endpoint.
#[derive(Clone)]
pub struct WeatherApiClient {
    client: Client,
    api_key: String,
    base_url: String,
    days: u8,
}

impl WeatherApiClient {
    pub fn new(config: &WeatherConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: trim_base_url(config.base_url.clone()),
            days: config.days,
        }
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiClient {
    async fn forecast(
        &self,
        coordinates: Coordinates,
    ) -> Result<(Forecast, Option<String>), WeatherError> {
        let response = self
            .client
            .get(format!("{}/forecast.json", self.base_url))
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", coordinates.to_query().as_str()),
                ("days", self.days.to_string().as_str()),
                ("aqi", "no"),
                ("alerts", "no"),
            ])
            .send()
            .await
            .map_err(|err| WeatherError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(WeatherError::Request(format!(
                "Weather API failed with HTTP {}",
                response.status().as_u16()
            )));
        }

        let parsed: ForecastResponse = response
            .json()
            .await
            .map_err(|err| WeatherError::Malformed(err.to_string()))?;

        Ok(parsed.into_domain())
    }
}

#[derive(Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    location: Option<WireLocation>,
    forecast: WireForecast,
}

#[derive(Deserialize)]
struct WireLocation {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    region: Option<String>,
}

#[derive(Deserialize)]
struct WireForecast {
    #[serde(default)]
    forecastday: Vec<WireForecastDay>,
}

#[derive(Deserialize)]
struct WireForecastDay {
    date: NaiveDate,
    day: WireDay,
}

#[derive(Deserialize)]
struct WireDay {
    maxtemp_c: f64,
    mintemp_c: f64,
    #[serde(default)]
    daily_chance_of_rain: f64,
    condition: WireCondition,
}

#[derive(Deserialize)]
struct WireCondition {
    text: String,
}

impl ForecastResponse {
    fn into_domain(self) -> (Forecast, Option<String>) {
        let days = self
            .forecast
            .forecastday
            .into_iter()
            .map(|entry| DayForecast {
                date: entry.date,
                max_temp_c: entry.day.maxtemp_c,
                min_temp_c: entry.day.mintemp_c,
                rain_chance_percent: entry.day.daily_chance_of_rain.clamp(0.0, 100.0).round()
                    as u8,
                condition_text: entry.day.condition.text,
            })
            .collect();

        (Forecast::new(days), self.location.and_then(WireLocation::label))
    }
}

impl WireLocation {
    fn label(self) -> Option<String> {
        let name = self.name.filter(|n| !n.trim().is_empty())?;
        match self.region.filter(|r| !r.trim().is_empty()) {
            Some(region) => Some(format!("{name}, {region}")),
            None => Some(name),
        }
    }
}
