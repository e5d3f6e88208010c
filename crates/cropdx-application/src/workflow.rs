//! Diagnosis workflow use case.
//!
//! Drives one [`Session`] through capture, upload, advice and weather. The
//! session is only ever changed through its transition methods, each call
//! publishing a fresh [`SessionSnapshot`] to subscribers.

use cropdx_core::advisory::AdvisoryService;
use cropdx_core::capture::{CaptureAdapter, ImageSource};
use cropdx_core::config::{ServiceConfig, WorkflowConfig};
use cropdx_core::error::{
    AdvisoryError, CaptureError, CropDxError, TransitionError, WeatherError, WorkflowError,
};
use cropdx_core::inference::InferenceClient;
use cropdx_core::session::{Phase, Session, SessionSnapshot, UploadTicket};
use cropdx_core::weather::{LocationProvider, WeatherProvider, WeatherStatus};
use cropdx_interaction::{HttpAdvisoryClient, HttpInferenceClient, StaticLocation, WeatherApiClient};
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::advisory_fetcher::AdvisoryFetcher;
use crate::weather_gate::WeatherGate;

/// The collaborators a workflow talks to.
#[derive(Clone)]
pub struct WorkflowServices {
    pub capture: Arc<dyn CaptureAdapter>,
    pub inference: Arc<dyn InferenceClient>,
    pub advisory: Option<Arc<dyn AdvisoryService>>,
    pub location: Option<Arc<dyn LocationProvider>>,
    pub weather: Option<Arc<dyn WeatherProvider>>,
}

impl WorkflowServices {
    /// Wires the HTTP clients described by `config`.
    ///
    /// `location` is the host's location capability; without one the
    /// `[location]` section is used, if present.
    pub fn from_config(
        config: &ServiceConfig,
        capture: Arc<dyn CaptureAdapter>,
        location: Option<Arc<dyn LocationProvider>>,
    ) -> Result<Self, CropDxError> {
        let inference = Arc::new(HttpInferenceClient::from_config(&config.inference)?);

        let advisory = match &config.advisory {
            Some(section) => {
                Some(Arc::new(HttpAdvisoryClient::from_config(section)?) as Arc<dyn AdvisoryService>)
            }
            None => None,
        };

        let weather = config
            .weather
            .as_ref()
            .map(|section| Arc::new(WeatherApiClient::new(section)) as Arc<dyn WeatherProvider>);

        let location = location.or_else(|| {
            config
                .location
                .as_ref()
                .map(|section| Arc::new(StaticLocation::from(section)) as Arc<dyn LocationProvider>)
        });

        Ok(Self {
            capture,
            inference,
            advisory,
            location,
            weather,
        })
    }
}

/// Session plus the channel its snapshots are published on.
struct Shared {
    session: RwLock<Session>,
    updates: watch::Sender<SessionSnapshot>,
}

impl Shared {
    /// Runs one transition under the write lock and publishes the result.
    async fn apply<R>(&self, transition: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.session.write().await;
        let result = transition(&mut session);
        self.updates.send_replace(SessionSnapshot::from(&*session));
        result
    }
}

/// One parameterized diagnosis workflow, shared by every screen variant.
pub struct DiagnosisWorkflow {
    session_id: String,
    shared: Arc<Shared>,
    capture: Arc<dyn CaptureAdapter>,
    inference: Arc<dyn InferenceClient>,
    advisory: Option<AdvisoryFetcher>,
    weather: Option<WeatherGate>,
    started: AtomicBool,
    weather_task: Mutex<Option<JoinHandle<()>>>,
}

impl DiagnosisWorkflow {
    /// Creates the workflow and its session in the variant's initial phase.
    pub fn new(config: WorkflowConfig, services: WorkflowServices) -> Self {
        let session = Session::new(config);
        let session_id = session.id().to_string();
        let (updates, _) = watch::channel(SessionSnapshot::from(&session));

        let weather = match (services.location, services.weather) {
            (Some(location), Some(weather)) => Some(WeatherGate::new(location, weather)),
            _ => None,
        };

        Self {
            session_id,
            shared: Arc::new(Shared {
                session: RwLock::new(session),
                updates,
            }),
            capture: services.capture,
            inference: services.inference,
            advisory: services.advisory.map(AdvisoryFetcher::new),
            weather,
            started: AtomicBool::new(false),
            weather_task: Mutex::new(None),
        }
    }

    /// Session start: probes permissions and kicks off the one weather fetch.
    ///
    /// Only the first call does anything. The forecast is fetched on its own
    /// task, concurrently with whatever capture or upload follows.
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let permissions = self.capture.check_permissions().await;
        if !permissions.any_granted() {
            warn!("Camera or media permissions not granted. Some features may be limited.");
        }

        let weather_enabled = self.shared.session.read().await.config().weather_enabled;
        info!(session_id = %self.session_id, weather_enabled, "diagnosis session started");

        if !weather_enabled {
            return;
        }
        let Some(gate) = self.weather.clone() else {
            self.shared
                .apply(|session| session.weather_resolved(Err(WeatherError::NotConfigured), None))
                .await;
            return;
        };

        self.shared.apply(Session::weather_requested).await;
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            let (coordinates, result) = gate.locate_and_resolve().await;
            shared
                .apply(|session| session.weather_resolved(result, coordinates))
                .await;
        });
        *self.weather_task.lock().await = Some(handle);
    }

    /// Waits for the start-up weather fetch, if one is running.
    pub async fn join_weather(&self) {
        let handle = self.weather_task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "weather task ended abnormally");
            }
        }
    }

    /// Fetches the forecast again, but only if the device moved since the
    /// last successful fetch.
    ///
    /// Does nothing when weather is disabled. A start-up fetch still running
    /// is awaited first, and no second fetch is issued while one is pending.
    pub async fn refresh_weather(&self) {
        if !self.shared.session.read().await.config().weather_enabled {
            return;
        }
        let Some(gate) = &self.weather else {
            return;
        };
        self.join_weather().await;

        let (coordinates, place_name) = match gate.locate().await {
            Ok(found) => found,
            Err(err) => {
                debug!(error = %err, "location unavailable, keeping current forecast");
                return;
            }
        };

        let claimed = self
            .shared
            .apply(|session| {
                if matches!(session.weather_status(), WeatherStatus::Pending) {
                    debug!("weather fetch already in progress");
                    return false;
                }
                if session
                    .weather_coordinates()
                    .is_some_and(|prev| prev.is_near(&coordinates))
                {
                    debug!("location unchanged, forecast kept");
                    return false;
                }
                session.weather_requested();
                true
            })
            .await;
        if !claimed {
            return;
        }

        let result = gate.resolve_forecast(coordinates).await.map(|mut resolved| {
            if place_name.is_some() {
                resolved.location_label = place_name;
            }
            resolved
        });
        if let Err(err) = &result {
            warn!(error = %err, "weather refresh failed");
        }
        self.shared
            .apply(|session| session.weather_resolved(result, Some(coordinates)))
            .await;
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Receiver that sees a new snapshot after every transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.updates.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from(&*self.shared.session.read().await)
    }

    pub async fn select_crop(&self, crop: &str) -> Result<(), WorkflowError> {
        self.shared
            .apply(|session| session.select_crop(crop))
            .await
            .map_err(WorkflowError::from)
    }

    /// Asks the capture capability for an image and makes it current.
    ///
    /// Returns `Ok(false)` when the user cancelled; the session is untouched.
    /// Permission or device failures are returned but never move the session
    /// into its `Error` phase.
    #[instrument(name = "acquire_image", skip_all, fields(session_id = %self.session_id))]
    pub async fn acquire_image(&self, source: ImageSource) -> Result<bool, WorkflowError> {
        if self.shared.session.read().await.phase() == Phase::CropPending {
            return Err(TransitionError::CropNotSelected.into());
        }

        let image = match self.capture.request_image(source).await {
            Ok(image) => image,
            Err(CaptureError::Cancelled) => {
                debug!(%source, "image selection cancelled");
                return Ok(false);
            }
            Err(err) => {
                warn!(%source, error = %err, "image acquisition failed");
                return Err(err.into());
            }
        };

        info!(%source, %image, "image acquired");
        self.shared
            .apply(|session| match source {
                ImageSource::Camera => session.capture_image(image),
                ImageSource::Gallery => session.pick_image(image),
            })
            .await?;
        Ok(true)
    }

    /// Uploads the current image, stores reduced detections and collects
    /// treatment advice for them.
    ///
    /// Refused while another upload is in flight. A failed upload leaves the
    /// session in `Error` with the image kept for a retry.
    #[instrument(name = "diagnose", skip_all, fields(session_id = %self.session_id))]
    pub async fn diagnose(&self) -> Result<SessionSnapshot, WorkflowError> {
        let (ticket, image, threshold) = self
            .shared
            .apply(|session| {
                let image = session.image_ref().cloned().ok_or(TransitionError::NoImage)?;
                let ticket = session.start_upload()?;
                Ok::<_, TransitionError>((ticket, image, session.config().score_threshold))
            })
            .await?;

        let outcome = match self.inference.submit(&image, threshold).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(status = ?err.status(), error = %err, "upload failed");
                self.shared
                    .apply(|session| session.upload_failed(ticket, err.clone()))
                    .await;
                return Err(err.into());
            }
        };

        let raw_count = outcome.detections.len();
        let current = self
            .shared
            .apply(|session| {
                session.upload_succeeded(ticket, &outcome.detections, outcome.annotated_artifact)
            })
            .await;
        if !current {
            return Ok(self.snapshot().await);
        }
        info!(raw_count, "detections received");

        self.collect_advice(ticket).await;
        Ok(self.snapshot().await)
    }

    /// Fetches advice for the reduced labels and records each outcome as it
    /// arrives.
    async fn collect_advice(&self, ticket: UploadTicket) {
        let (crop, labels) = {
            let session = self.shared.session.read().await;
            (session.advisory_crop().map(str::to_string), session.labels())
        };
        let Some(crop) = crop else {
            return;
        };
        if labels.is_empty() {
            return;
        }

        let Some(fetcher) = &self.advisory else {
            warn!("advice requested but no advisory service is configured");
            self.shared
                .apply(|session| {
                    for label in &labels {
                        session.advice_received(
                            ticket,
                            label,
                            Err(AdvisoryError::Request {
                                label: label.clone(),
                                message: "advisory service not configured".to_string(),
                            }),
                        );
                    }
                })
                .await;
            return;
        };

        let mut pending = fetcher.requests(&crop, &labels);
        while let Some((label, result)) = pending.next().await {
            if let Err(err) = &result {
                warn!(%label, error = %err, "advice unavailable");
            }
            self.shared
                .apply(|session| session.advice_received(ticket, &label, result))
                .await;
        }
    }
}

#[cfg(test)]
#[path = "workflow_test.rs"]
mod tests;
