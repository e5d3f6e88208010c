use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a session is in the capture-to-diagnosis workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing captured yet (or crop chosen, waiting for an image).
    Idle,
    /// Variant requires a crop and none has been selected.
    CropPending,
    /// An image is set and no results exist for it.
    ImageReady,
    /// The inference request for the current image is in flight.
    Uploading,
    /// Reduced detections for the current image are available.
    ResultsReady,
    /// The last upload failed; the image is kept for a retry.
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::CropPending => "crop_pending",
            Phase::ImageReady => "image_ready",
            Phase::Uploading => "uploading",
            Phase::ResultsReady => "results_ready",
            Phase::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proof that `start_upload` succeeded, handed back with the upload result.
///
/// The ticket remembers which image it was issued for, so a result that comes
/// back after a newer image was captured is recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UploadTicket {
    pub(crate) generation: u64,
}

impl UploadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
