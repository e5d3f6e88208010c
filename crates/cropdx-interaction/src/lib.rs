//! HTTP implementations of the CropDx collaborator traits.
//!
//! Each client owns a `reqwest::Client` and maps transport failures onto the
//! matching error type from `cropdx_core::error`.

pub mod advisory_client;
pub mod inference_client;
pub mod location;
pub mod weather_client;

#[cfg(test)]
mod test_support;

pub use advisory_client::HttpAdvisoryClient;
pub use inference_client::HttpInferenceClient;
pub use location::StaticLocation;
pub use weather_client::WeatherApiClient;
