//! Weather domain module.
//!
//! - `model`: forecast data and the gate's status values
//! - `provider`: location and forecast capability traits

mod model;
mod provider;

pub use model::{
    Coordinates, DayForecast, Forecast, MAX_FORECAST_DAYS, ResolvedForecast, WeatherDisplay,
    WeatherStatus,
};
pub use provider::{DeviceLocation, LocationProvider, WeatherProvider};
