use serde::Serialize;
use std::collections::BTreeMap;

use super::model::Session;
use super::phase::Phase;
use crate::advisory::AdviceStatus;
use crate::detection::Detection;
use crate::inference::artifact_data_uri;
use crate::weather::WeatherDisplay;

/// Advice status of one detected label, in detection order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelAdvice {
    pub label: String,
    /// `pending`, `ready` or `unavailable`.
    pub status: &'static str,
    pub advice: Option<String>,
}

impl LabelAdvice {
    fn new(label: &str, status: &AdviceStatus) -> Self {
        let state = match status {
            AdviceStatus::Pending => "pending",
            AdviceStatus::Ready(_) => "ready",
            AdviceStatus::Unavailable => "unavailable",
        };
        Self {
            label: label.to_string(),
            status: state,
            advice: status.text().map(str::to_string),
        }
    }
}

/// Read-only view of a session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub phase: Phase,
    pub selected_crop: Option<String>,
    pub image_ref: Option<String>,
    pub detections: Vec<Detection>,
    /// Only labels whose advice arrived.
    pub advisory: BTreeMap<String, String>,
    pub advice_status: Vec<LabelAdvice>,
    pub show_weather: bool,
    pub weather: WeatherDisplay,
    pub upload_in_flight: bool,
    pub error: Option<String>,
    /// Annotated image as a `data:image/png;base64,...` URI.
    pub annotated_image: Option<String>,
}

impl From<&Session> for SessionSnapshot {
    fn from(session: &Session) -> Self {
        let advice_status = session
            .detections()
            .iter()
            .filter_map(|detection| {
                session
                    .advice_status(detection.label())
                    .map(|status| LabelAdvice::new(detection.label(), status))
            })
            .collect();

        Self {
            session_id: session.id().to_string(),
            phase: session.phase(),
            selected_crop: session.selected_crop().map(str::to_string),
            image_ref: session.image_ref().map(|image| image.to_string()),
            detections: session.detections().to_vec(),
            advisory: session
                .advisory()
                .into_iter()
                .map(|(label, text)| (label.to_string(), text.to_string()))
                .collect(),
            advice_status,
            show_weather: session.show_weather(),
            weather: session.weather_display(),
            upload_in_flight: session.is_upload_in_flight(),
            error: session.error().map(|err| err.to_string()),
            annotated_image: session.annotated_artifact().map(artifact_data_uri),
        }
    }
}

impl SessionSnapshot {
    /// One-line summary of the detection pass, as shown after an upload.
    pub fn summary(&self) -> String {
        match (self.phase, self.detections.len()) {
            (Phase::ResultsReady, 0) => "Model found no objects.".to_string(),
            (Phase::ResultsReady, n) => format!("Found {n} detections"),
            (Phase::Error, _) => format!(
                "Upload failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            ),
            (phase, _) => phase.to_string(),
        }
    }
}
