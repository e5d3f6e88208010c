//! Application layer for CropDx.
//!
//! This crate provides the diagnosis use case, coordinating the session state
//! machine with the capture, inference, advisory and weather collaborators.

pub mod advisory_fetcher;
pub mod weather_gate;
pub mod workflow;

pub use advisory_fetcher::AdvisoryFetcher;
pub use weather_gate::WeatherGate;
pub use workflow::{DiagnosisWorkflow, WorkflowServices};
