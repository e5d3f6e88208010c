//! HttpInferenceClient - multipart upload to the detection service.
//!
//! Sends `POST {base_url}/predict?score_thresh=..` with the image streamed as
//! the `file` field. The multipart boundary header comes from reqwest.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use cropdx_core::capture::ImageRef;
use cropdx_core::config::InferenceConfig;
use cropdx_core::detection::{BoundingBox, Detection};
use cropdx_core::error::{CropDxError, UploadError};
use cropdx_core::inference::{InferenceClient, UploadOutcome};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// Inference client that talks to the detection service over HTTP.
#[derive(Clone)]
pub struct HttpInferenceClient {
    client: Client,
    base_url: String,
}

impl HttpInferenceClient {
    /// Creates a client without a request timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: trim_base_url(base_url.into()),
        }
    }

    /// Builds a client from the `[inference]` config section.
    pub fn from_config(config: &InferenceConfig) -> Result<Self, CropDxError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            CropDxError::config(format!("Failed to build inference HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            base_url: trim_base_url(config.base_url.clone()),
        })
    }

    async fn image_part(image: &ImageRef) -> Result<Part, UploadError> {
        let path = image.to_path();
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| UploadError::image(format!("{}: {e}", path.display())))?;
        let length = file.metadata().await.ok().map(|meta| meta.len());

        let body = Body::wrap_stream(ReaderStream::new(file));
        let part = match length {
            Some(len) => Part::stream_with_length(body, len),
            None => Part::stream(body),
        };

        part.file_name(image.file_name())
            .mime_str(image.mime_type())
            .map_err(|e| UploadError::image(format!("Invalid MIME type: {e}")))
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn submit(
        &self,
        image: &ImageRef,
        score_threshold: f32,
    ) -> Result<UploadOutcome, UploadError> {
        let form = Form::new().part("file", Self::image_part(image).await?);
        let url = format!("{}/predict", self.base_url);

        debug!(%image, score_threshold, "uploading image for inference");
        let response = self
            .client
            .post(url)
            .query(&[("score_thresh", score_threshold)])
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|err| UploadError::network(format!("Inference request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read inference error body".to_string());
            return Err(UploadError::http(status.as_u16(), body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| UploadError::network(format!("Inference response lost: {err}")))?;

        Ok(parse_prediction(&body))
    }
}

#[derive(Deserialize)]
struct WireDetection {
    label: String,
    score: f64,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

/// Reads a prediction body leniently.
///
/// Anything unusable in `detections` means "no detections"; a missing or
/// undecodable artifact means "no artifact". Neither is an error.
fn parse_prediction(body: &[u8]) -> UploadOutcome {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "inference response is not JSON, treating as no detections");
            return UploadOutcome::default();
        }
    };

    UploadOutcome {
        detections: parse_detections(value.get("detections")),
        annotated_artifact: parse_artifact(value.get("annotated_image_base64")),
    }
}

fn parse_detections(value: Option<&Value>) -> Vec<Detection> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Vec::new();
    };
    let Some(entries) = value.as_array() else {
        warn!("detections is not an array, treating as none");
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let wire = match serde_json::from_value::<WireDetection>(entry.clone()) {
                Ok(wire) => wire,
                Err(err) => {
                    warn!(index, error = %err, "skipping malformed detection");
                    return None;
                }
            };
            let detection = Detection::new(
                wire.label,
                wire.score,
                BoundingBox::new(wire.x1, wire.y1, wire.x2, wire.y2),
            );
            if detection.is_none() {
                warn!(index, "skipping detection with invalid label, score or box");
            }
            detection
        })
        .collect()
}

fn parse_artifact(value: Option<&Value>) -> Option<Vec<u8>> {
    let encoded = value?.as_str().filter(|s| !s.is_empty())?;
    match BASE64_STANDARD.decode(encoded) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            warn!(error = %err, "annotated image is not valid base64, dropping it");
            None
        }
    }
}

pub(crate) fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
