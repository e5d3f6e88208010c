//! Image acquisition boundary.
//!
//! The capture capability (camera, gallery picker) lives in the host
//! platform. The workflow only ever sees an [`ImageRef`]; bytes are read later
//! by the upload client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

use crate::error::CaptureError;

/// Where an image should come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Gallery,
    Camera,
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Gallery => write!(f, "gallery"),
            ImageSource::Camera => write!(f, "camera"),
        }
    }
}

/// Opaque handle to captured or picked content.
///
/// Usually a `file://` URI or a plain path as reported by the picker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the reference, `photo.jpg` when there is none.
    pub fn file_name(&self) -> String {
        self.0
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("photo.jpg")
            .to_string()
    }

    /// MIME type inferred from the extension: `.png` is PNG, anything else JPEG.
    ///
    /// Advisory only. The inference server decides how to decode the bytes.
    pub fn mime_type(&self) -> &'static str {
        let name = self.file_name();
        match name.rsplit_once('.') {
            Some((_, ext)) if ext.eq_ignore_ascii_case("png") => "image/png",
            _ => "image/jpeg",
        }
    }

    /// Local filesystem path the reference points at.
    ///
    /// `file://` URIs are percent-decoded; anything else is taken as a path.
    pub fn to_path(&self) -> PathBuf {
        Url::parse(&self.0)
            .ok()
            .filter(|url| url.scheme() == "file")
            .and_then(|url| url.to_file_path().ok())
            .unwrap_or_else(|| PathBuf::from(self.0.strip_prefix("file://").unwrap_or(&self.0)))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Camera and media library access, as probed when the workflow starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionStatus {
    pub camera: bool,
    pub media_library: bool,
}

impl PermissionStatus {
    pub fn any_granted(&self) -> bool {
        self.camera || self.media_library
    }
}

/// Boundary to the host's image acquisition capability.
#[async_trait]
pub trait CaptureAdapter: Send + Sync {
    /// Opens the picker or camera and returns a reference to the chosen image.
    ///
    /// # Returns
    ///
    /// - `Ok(ImageRef)`: an image was selected or captured
    /// - `Err(CaptureError::Cancelled)`: the user backed out
    /// - `Err(_)`: permission denied or the capability failed
    async fn request_image(&self, source: ImageSource) -> Result<ImageRef, CaptureError>;

    /// Reports which sources are currently accessible.
    async fn check_permissions(&self) -> PermissionStatus {
        PermissionStatus {
            camera: true,
            media_library: true,
        }
    }
}
