//! Error types for the CropDx workflow.
//!
//! Each collaborator boundary has its own error enum. Only [`UploadError`]
//! ever reaches the session as an `Error` phase; the rest degrade to absent or
//! unavailable values inside the workflow.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure while acquiring an image from the capture capability.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureError {
    /// The user dismissed the picker. Not a failure: the session is left untouched.
    #[error("Image selection was cancelled")]
    Cancelled,

    /// Camera or media library access was refused.
    #[error("Permission denied for {source_name}")]
    PermissionDenied { source_name: String },

    /// The capability itself failed (no camera, picker crashed, ...).
    #[error("Capture unavailable: {message}")]
    Unavailable { message: String },
}

impl CaptureError {
    /// Check if this error is a user cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Failure of a single inference upload.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UploadError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// No response was received.
    #[error("Network failure: {cause}")]
    Network { cause: String },

    /// The referenced image could not be opened for streaming.
    #[error("Image could not be read: {cause}")]
    Image { cause: String },
}

impl UploadError {
    /// Creates an Http error
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Creates a Network error
    pub fn network(cause: impl Into<String>) -> Self {
        Self::Network {
            cause: cause.into(),
        }
    }

    /// Creates an Image error
    pub fn image(cause: impl Into<String>) -> Self {
        Self::Image {
            cause: cause.into(),
        }
    }

    /// HTTP status of the failed request, `None` when no response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network { .. } | Self::Image { .. } => None,
        }
    }
}

/// Failure of one per-label advisory request. Always swallowed by the workflow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdvisoryError {
    #[error("Advisory request for '{label}' failed: {message}")]
    Request { label: String, message: String },

    #[error("Advisory response for '{label}' was malformed: {message}")]
    Malformed { label: String, message: String },
}

/// Failure of the location or forecast lookup. Always swallowed by the workflow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeatherError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    Location(String),

    #[error("Forecast request failed: {0}")]
    Request(String),

    #[error("Forecast response was malformed: {0}")]
    Malformed(String),

    #[error("Weather is not configured")]
    NotConfigured,
}

/// A transition the state machine refused. The session is left unchanged and
/// the message is meant to be shown to the user as a prompt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Please select a crop first.")]
    CropNotSelected,

    #[error("'{0}' is not one of the supported crops.")]
    UnknownCrop(String),

    #[error("Please pick or take a photo first.")]
    NoImage,

    #[error("A diagnosis is already in progress.")]
    UploadInFlight,

    #[error("Action '{action}' is not available while {phase}.")]
    InvalidPhase { action: &'static str, phase: String },
}

/// Errors returned by workflow operations to the presentation layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// A shared error type for setup concerns (configuration, files, parsing).
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum CropDxError {
    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CropDxError {
    /// Creates a Serialization error for the given format
    pub fn serialization(format: &str, message: impl Into<String>) -> Self {
        Self::Serialization {
            format: format.to_string(),
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a serialization error
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for CropDxError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for CropDxError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("JSON", err.to_string())
    }
}

impl From<toml::de::Error> for CropDxError {
    fn from(err: toml::de::Error) -> Self {
        Self::serialization("TOML", err.to_string())
    }
}

/// A type alias for `Result<T, CropDxError>`.
pub type Result<T> = std::result::Result<T, CropDxError>;
