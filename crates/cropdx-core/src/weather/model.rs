use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Longest forecast the workflow keeps.
pub const MAX_FORECAST_DAYS: usize = 14;

/// Degrees within which two positions count as the same place (~1 km).
const SAME_PLACE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when `other` is close enough that a cached forecast still applies.
    pub fn is_near(&self, other: &Coordinates) -> bool {
        (self.latitude - other.latitude).abs() < SAME_PLACE_TOLERANCE
            && (self.longitude - other.longitude).abs() < SAME_PLACE_TOLERANCE
    }

    /// `lat,lon` as weather providers expect in their query.
    pub fn to_query(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    pub rain_chance_percent: u8,
    pub condition_text: String,
}

/// Ordered daily forecast, at most [`MAX_FORECAST_DAYS`] long.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forecast(Vec<DayForecast>);

impl Forecast {
    /// Keeps the first [`MAX_FORECAST_DAYS`] entries.
    pub fn new(mut days: Vec<DayForecast>) -> Self {
        days.truncate(MAX_FORECAST_DAYS);
        Self(days)
    }

    pub fn days(&self) -> &[DayForecast] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Forecast plus the place name to show above it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedForecast {
    pub forecast: Forecast,
    pub location_label: Option<String>,
}

/// Progress of the one weather fetch a session makes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WeatherStatus {
    #[default]
    NotRequested,
    Pending,
    Ready {
        resolved: ResolvedForecast,
        coordinates: Option<Coordinates>,
    },
    Unavailable {
        reason: String,
    },
}

/// What the weather section should render right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WeatherDisplay {
    /// Gate closed: no successful detection yet for the current image.
    Hidden,
    Loading,
    Ready {
        forecast: Forecast,
        location_label: Option<String>,
    },
    /// Gate open but no fetch was ever started for this session.
    NotRequested,
    /// Gate open but the fetch failed. Shown as "unavailable", not as an error.
    Unavailable,
}
