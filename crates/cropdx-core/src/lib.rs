//! Domain layer of the CropDx diagnosis workflow.
//!
//! Holds the session state machine, the detection reducer, the error
//! taxonomy and the traits through which the workflow reaches its external
//! collaborators (capture, inference, advisory, location, weather).

pub mod advisory;
pub mod capture;
pub mod config;
pub mod detection;
pub mod error;
pub mod inference;
pub mod session;
pub mod weather;

pub use error::{CropDxError, Result};
