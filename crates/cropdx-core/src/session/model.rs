use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::phase::{Phase, UploadTicket};
use crate::advisory::AdviceStatus;
use crate::capture::ImageRef;
use crate::config::{UNSELECTED_CROP, WorkflowConfig};
use crate::detection::{Detection, reduce};
use crate::error::{AdvisoryError, TransitionError, UploadError, WeatherError};
use crate::weather::{Coordinates, Forecast, ResolvedForecast, WeatherDisplay, WeatherStatus};

/// The diagnosis session state machine.
///
/// Fields are private: the invariants below hold because every change goes
/// through a named transition.
///
/// - at most one upload is in flight
/// - `detections` is always reducer output
/// - `show_weather` is only set by a successful upload for the current image
/// - advice is only kept for labels present in `detections`
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    config: WorkflowConfig,
    phase: Phase,
    selected_crop: Option<String>,
    image_ref: Option<ImageRef>,
    /// Bumped on every new image; tickets from older generations are stale.
    image_generation: u64,
    in_flight: Option<UploadTicket>,
    detections: Vec<Detection>,
    annotated_artifact: Option<Vec<u8>>,
    advice: HashMap<String, AdviceStatus>,
    show_weather: bool,
    weather: WeatherStatus,
    error: Option<UploadError>,
}

impl Session {
    /// Creates a session in its initial phase for the given variant.
    pub fn new(config: WorkflowConfig) -> Self {
        let phase = Self::initial_phase(&config);
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            config,
            phase,
            selected_crop: None,
            image_ref: None,
            image_generation: 0,
            in_flight: None,
            detections: Vec::new(),
            annotated_artifact: None,
            advice: HashMap::new(),
            show_weather: false,
            weather: WeatherStatus::NotRequested,
            error: None,
        }
    }

    fn initial_phase(config: &WorkflowConfig) -> Phase {
        if config.require_crop_selection {
            Phase::CropPending
        } else {
            Phase::Idle
        }
    }

    // ============================================================================
    // Transitions
    // ============================================================================

    /// Records the crop the user picked.
    ///
    /// Leaves `CropPending` for `Idle`. Refused for the unselected sentinel,
    /// for crops outside the configured options, and once an upload started
    /// for the current image.
    pub fn select_crop(&mut self, crop: &str) -> Result<(), TransitionError> {
        if matches!(self.phase, Phase::Uploading | Phase::ResultsReady) {
            return Err(self.invalid_phase("select_crop"));
        }

        let crop = crop.trim();
        if crop.is_empty() || crop.eq_ignore_ascii_case(UNSELECTED_CROP) {
            return Err(TransitionError::CropNotSelected);
        }
        if !self.config.crop_options.is_empty()
            && !self.config.crop_options.iter().any(|option| option == crop)
        {
            return Err(TransitionError::UnknownCrop(crop.to_string()));
        }

        self.selected_crop = Some(crop.to_string());
        if self.phase == Phase::CropPending {
            self.phase = Phase::Idle;
        }
        debug!(session_id = %self.id, crop, "crop selected");
        Ok(())
    }

    /// A new photo was taken with the camera.
    pub fn capture_image(&mut self, image: ImageRef) -> Result<(), TransitionError> {
        self.accept_image(image)
    }

    /// A photo was chosen from the gallery.
    pub fn pick_image(&mut self, image: ImageRef) -> Result<(), TransitionError> {
        self.accept_image(image)
    }

    /// Moves to `ImageReady` and drops every result of the previous image in
    /// the same step.
    fn accept_image(&mut self, image: ImageRef) -> Result<(), TransitionError> {
        if self.phase == Phase::CropPending {
            return Err(TransitionError::CropNotSelected);
        }

        self.image_generation += 1;
        self.image_ref = Some(image);
        self.detections.clear();
        self.annotated_artifact = None;
        self.advice.clear();
        self.show_weather = false;
        self.error = None;
        self.phase = Phase::ImageReady;
        debug!(
            session_id = %self.id,
            generation = self.image_generation,
            "image accepted, previous results cleared"
        );
        Ok(())
    }

    /// Enters `Uploading` and hands out the ticket for the request.
    ///
    /// Refused without an image and while another upload is in flight, which
    /// includes one left over from a previous image.
    pub fn start_upload(&mut self) -> Result<UploadTicket, TransitionError> {
        if self.in_flight.is_some() {
            return Err(TransitionError::UploadInFlight);
        }
        match self.phase {
            Phase::ImageReady | Phase::Error => {}
            Phase::Idle | Phase::CropPending => return Err(TransitionError::NoImage),
            Phase::Uploading => return Err(TransitionError::UploadInFlight),
            Phase::ResultsReady => return Err(self.invalid_phase("start_upload")),
        }
        if self.image_ref.is_none() {
            return Err(TransitionError::NoImage);
        }

        let ticket = UploadTicket {
            generation: self.image_generation,
        };
        self.in_flight = Some(ticket);
        self.error = None;
        self.phase = Phase::Uploading;
        Ok(ticket)
    }

    /// Stores the reduced detections and opens the weather gate.
    ///
    /// Returns `false` when the result belongs to a superseded image and was
    /// dropped. The in-flight slot is released either way.
    pub fn upload_succeeded(
        &mut self,
        ticket: UploadTicket,
        raw: &[Detection],
        annotated_artifact: Option<Vec<u8>>,
    ) -> bool {
        if !self.settle(ticket) {
            return false;
        }

        self.detections = reduce(raw);
        self.annotated_artifact = annotated_artifact;
        self.advice.clear();
        if self.advisory_crop().is_some() {
            for detection in &self.detections {
                self.advice
                    .insert(detection.label().to_string(), AdviceStatus::Pending);
            }
        }
        self.show_weather = true;
        self.phase = Phase::ResultsReady;
        true
    }

    /// Records a failed upload. Image and previous detections stay as they were.
    pub fn upload_failed(&mut self, ticket: UploadTicket, error: UploadError) -> bool {
        if !self.settle(ticket) {
            return false;
        }

        self.error = Some(error);
        self.phase = Phase::Error;
        true
    }

    /// Releases the in-flight slot and reports whether the ticket is current.
    fn settle(&mut self, ticket: UploadTicket) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
        }
        let current = ticket.generation == self.image_generation && self.phase == Phase::Uploading;
        if !current {
            debug!(
                session_id = %self.id,
                ticket = ticket.generation,
                generation = self.image_generation,
                "discarding stale upload result"
            );
        }
        current
    }

    /// Records the outcome of one label's advisory lookup.
    ///
    /// Ignored unless the label is among the current detections of the image
    /// the ticket was issued for.
    pub fn advice_received(
        &mut self,
        ticket: UploadTicket,
        label: &str,
        result: Result<String, AdvisoryError>,
    ) -> bool {
        if ticket.generation != self.image_generation || self.phase != Phase::ResultsReady {
            return false;
        }
        let Some(slot) = self.advice.get_mut(label) else {
            return false;
        };

        *slot = match result {
            Ok(text) => AdviceStatus::Ready(text),
            Err(_) => AdviceStatus::Unavailable,
        };
        true
    }

    /// The weather fetch has started.
    pub fn weather_requested(&mut self) {
        self.weather = WeatherStatus::Pending;
    }

    /// Stores the weather fetch outcome. Never touches the phase.
    pub fn weather_resolved(
        &mut self,
        result: Result<ResolvedForecast, WeatherError>,
        coordinates: Option<Coordinates>,
    ) {
        self.weather = match result {
            Ok(resolved) => WeatherStatus::Ready {
                resolved,
                coordinates,
            },
            Err(err) => WeatherStatus::Unavailable {
                reason: err.to_string(),
            },
        };
    }

    fn invalid_phase(&self, action: &'static str) -> TransitionError {
        TransitionError::InvalidPhase {
            action,
            phase: self.phase.to_string(),
        }
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selected_crop(&self) -> Option<&str> {
        self.selected_crop.as_deref()
    }

    /// Crop to ask advice for, or `None` when advice is off or no crop is known.
    pub fn advisory_crop(&self) -> Option<&str> {
        if !self.config.fetch_advice {
            return None;
        }
        self.selected_crop
            .as_deref()
            .or(self.config.default_crop.as_deref())
    }

    pub fn image_ref(&self) -> Option<&ImageRef> {
        self.image_ref.as_ref()
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    /// Labels of the current detections, in display order.
    pub fn labels(&self) -> Vec<String> {
        self.detections
            .iter()
            .map(|d| d.label().to_string())
            .collect()
    }

    pub fn annotated_artifact(&self) -> Option<&[u8]> {
        self.annotated_artifact.as_deref()
    }

    /// Advice text per label, only for lookups that succeeded.
    pub fn advisory(&self) -> HashMap<&str, &str> {
        self.advice
            .iter()
            .filter_map(|(label, status)| status.text().map(|text| (label.as_str(), text)))
            .collect()
    }

    pub fn advice_status(&self, label: &str) -> Option<&AdviceStatus> {
        self.advice.get(label)
    }

    pub fn show_weather(&self) -> bool {
        self.show_weather
    }

    pub fn weather_status(&self) -> &WeatherStatus {
        &self.weather
    }

    /// The fetched forecast, whether or not the gate is open.
    pub fn weather(&self) -> Option<&Forecast> {
        match &self.weather {
            WeatherStatus::Ready { resolved, .. } => Some(&resolved.forecast),
            _ => None,
        }
    }

    pub fn location_label(&self) -> Option<&str> {
        match &self.weather {
            WeatherStatus::Ready { resolved, .. } => resolved.location_label.as_deref(),
            _ => None,
        }
    }

    /// Position the current forecast was fetched for.
    pub fn weather_coordinates(&self) -> Option<Coordinates> {
        match &self.weather {
            WeatherStatus::Ready { coordinates, .. } => *coordinates,
            _ => None,
        }
    }

    /// The weather section as it should be rendered, gate applied.
    pub fn weather_display(&self) -> WeatherDisplay {
        if !self.config.weather_enabled || !self.show_weather {
            return WeatherDisplay::Hidden;
        }
        match &self.weather {
            WeatherStatus::Ready { resolved, .. } => WeatherDisplay::Ready {
                forecast: resolved.forecast.clone(),
                location_label: resolved.location_label.clone(),
            },
            WeatherStatus::Pending => WeatherDisplay::Loading,
            WeatherStatus::NotRequested => WeatherDisplay::NotRequested,
            WeatherStatus::Unavailable { .. } => WeatherDisplay::Unavailable,
        }
    }

    pub fn error(&self) -> Option<&UploadError> {
        self.error.as_ref()
    }

    pub fn is_upload_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }
}
