//! Inference service boundary.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

use crate::capture::ImageRef;
use crate::detection::Detection;
use crate::error::UploadError;

/// What one successful upload returned, before reduction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UploadOutcome {
    /// Raw detections, possibly with several entries per label.
    pub detections: Vec<Detection>,
    /// Annotated image bytes, when the server sent one.
    pub annotated_artifact: Option<Vec<u8>>,
}

impl UploadOutcome {
    /// Annotated image as a `data:` URI for display.
    pub fn annotated_data_uri(&self) -> Option<String> {
        self.annotated_artifact.as_deref().map(artifact_data_uri)
    }
}

/// Renders artifact bytes as a PNG data URI.
pub fn artifact_data_uri(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64_STANDARD.encode(bytes))
}

/// Sends an image to the inference service.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Uploads the referenced image once and returns what the model found.
    ///
    /// # Arguments
    ///
    /// * `image` - Reference to the image to stream
    /// * `score_threshold` - Minimum score the server should report
    async fn submit(&self, image: &ImageRef, score_threshold: f32)
    -> Result<UploadOutcome, UploadError>;
}
