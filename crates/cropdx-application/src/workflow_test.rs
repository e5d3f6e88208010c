use super::*;
use async_trait::async_trait;
use chrono::NaiveDate;
use cropdx_core::capture::{ImageRef, PermissionStatus};
use cropdx_core::detection::{BoundingBox, Detection};
use cropdx_core::error::UploadError;
use cropdx_core::inference::UploadOutcome;
use cropdx_core::weather::{Coordinates, DayForecast, DeviceLocation, Forecast, WeatherDisplay};
use std::collections::VecDeque;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::AtomicUsize;
use tokio::sync::Notify;

// ============================================================================
// Fakes
// ============================================================================

struct FakeCapture {
    script: StdMutex<VecDeque<Result<ImageRef, CaptureError>>>,
    calls: AtomicUsize,
}

impl FakeCapture {
    fn returning(results: Vec<Result<ImageRef, CaptureError>>) -> Arc<Self> {
        Arc::new(Self {
            script: StdMutex::new(results.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureAdapter for FakeCapture {
    async fn request_image(&self, _source: ImageSource) -> Result<ImageRef, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(CaptureError::Cancelled))
    }

    async fn check_permissions(&self) -> PermissionStatus {
        PermissionStatus {
            camera: false,
            media_library: true,
        }
    }
}

struct FakeInference {
    script: StdMutex<VecDeque<Result<UploadOutcome, UploadError>>>,
    calls: AtomicUsize,
    hold: Option<Arc<Notify>>,
}

impl FakeInference {
    fn returning(results: Vec<Result<UploadOutcome, UploadError>>) -> Arc<Self> {
        Arc::new(Self {
            script: StdMutex::new(results.into()),
            calls: AtomicUsize::new(0),
            hold: None,
        })
    }

    fn held(results: Vec<Result<UploadOutcome, UploadError>>, hold: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            script: StdMutex::new(results.into()),
            calls: AtomicUsize::new(0),
            hold: Some(hold),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for FakeInference {
    async fn submit(
        &self,
        _image: &ImageRef,
        score_threshold: f32,
    ) -> Result<UploadOutcome, UploadError> {
        assert_eq!(score_threshold, 0.25);
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(UploadOutcome::default()))
    }
}

/// Fails for `rust`, answers every other label.
struct FakeAdvisory {
    calls: StdMutex<Vec<(String, String)>>,
}

#[async_trait]
impl AdvisoryService for FakeAdvisory {
    async fn treatment_advice(&self, crop: &str, label: &str) -> Result<String, AdvisoryError> {
        self.calls
            .lock()
            .unwrap()
            .push((crop.to_string(), label.to_string()));
        if label == "rust" {
            return Err(AdvisoryError::Request {
                label: label.to_string(),
                message: "status 503".to_string(),
            });
        }
        Ok(format!("Treat {label} on {crop}"))
    }
}

struct MovableLocation {
    at: StdMutex<Coordinates>,
}

#[async_trait]
impl LocationProvider for MovableLocation {
    async fn current_location(&self) -> Result<DeviceLocation, WeatherError> {
        Ok(DeviceLocation {
            coordinates: *self.at.lock().unwrap(),
            place_name: None,
        })
    }
}

struct FakeWeather {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn forecast(
        &self,
        _coordinates: Coordinates,
    ) -> Result<(Forecast, Option<String>), WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(WeatherError::Request("status 401".to_string()));
        }
        let day = DayForecast {
            date: forecast_date(),
            max_temp_c: 30.5,
            min_temp_c: 19.0,
            rain_chance_percent: 60,
            condition_text: "Patchy rain nearby".to_string(),
        };
        Ok((Forecast::new(vec![day]), Some("Mysuru, Karnataka".to_string())))
    }
}

fn forecast_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
}

// ============================================================================
// Helpers
// ============================================================================

fn det(label: &str, score: f64) -> Detection {
    Detection::new(label, score, BoundingBox::new(1.0, 2.0, 30.0, 40.0)).unwrap()
}

fn outcome(detections: Vec<Detection>) -> UploadOutcome {
    UploadOutcome {
        detections,
        annotated_artifact: None,
    }
}

fn leaf(name: &str) -> Result<ImageRef, CaptureError> {
    Ok(ImageRef::new(format!("file:///photos/{name}")))
}

struct Harness {
    workflow: DiagnosisWorkflow,
    capture: Arc<FakeCapture>,
    inference: Arc<FakeInference>,
    advisory: Arc<FakeAdvisory>,
    location: Arc<MovableLocation>,
    weather: Arc<FakeWeather>,
}

fn harness(
    config: WorkflowConfig,
    capture: Arc<FakeCapture>,
    inference: Arc<FakeInference>,
    weather_fails: bool,
) -> Harness {
    let advisory = Arc::new(FakeAdvisory {
        calls: StdMutex::new(Vec::new()),
    });
    let location = Arc::new(MovableLocation {
        at: StdMutex::new(Coordinates::new(12.30, 76.64)),
    });
    let weather = Arc::new(FakeWeather {
        calls: AtomicUsize::new(0),
        fail: weather_fails,
    });
    let services = WorkflowServices {
        capture: capture.clone(),
        inference: inference.clone(),
        advisory: Some(advisory.clone()),
        location: Some(location.clone()),
        weather: Some(weather.clone()),
    };
    Harness {
        workflow: DiagnosisWorkflow::new(config, services),
        capture,
        inference,
        advisory,
        location,
        weather,
    }
}

fn assistant() -> WorkflowConfig {
    WorkflowConfig::field_assistant(vec!["tomato".to_string(), "maize".to_string()])
}

/// Spins until the first upload has claimed the in-flight slot.
async fn until_in_flight(workflow: &DiagnosisWorkflow) {
    while !workflow.snapshot().await.upload_in_flight {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn diagnosis_reduces_collects_advice_and_reveals_weather() {
    let h = harness(
        assistant(),
        FakeCapture::returning(vec![leaf("leaf.jpg")]),
        FakeInference::returning(vec![Ok(outcome(vec![
            det("rust", 0.8),
            det("rust", 0.95),
            det("blight", 0.4),
        ]))]),
        false,
    );
    h.workflow.start().await;
    h.workflow.join_weather().await;
    assert_eq!(h.workflow.snapshot().await.weather, WeatherDisplay::Hidden);

    h.workflow.select_crop("tomato").await.unwrap();
    assert!(h.workflow.acquire_image(ImageSource::Camera).await.unwrap());
    let snapshot = h.workflow.diagnose().await.unwrap();

    assert_eq!(snapshot.phase, Phase::ResultsReady);
    let labels: Vec<&str> = snapshot.detections.iter().map(|d| d.label()).collect();
    assert_eq!(labels, vec!["rust", "blight"]);
    assert_eq!(snapshot.detections[0].score(), 0.95);

    assert_eq!(snapshot.advisory.len(), 1);
    assert_eq!(
        snapshot.advisory.get("blight").map(String::as_str),
        Some("Treat blight on tomato")
    );
    assert!(!snapshot.advisory.contains_key("rust"));
    assert_eq!(snapshot.advice_status[0].label, "rust");
    assert_eq!(snapshot.advice_status[0].status, "unavailable");
    assert!(snapshot.error.is_none());

    match snapshot.weather {
        WeatherDisplay::Ready {
            forecast,
            location_label,
        } => {
            assert_eq!(forecast.len(), 1);
            assert_eq!(location_label.as_deref(), Some("Mysuru, Karnataka"));
        }
        other => panic!("expected ready weather, got {other:?}"),
    }
    assert_eq!(h.advisory.calls.lock().unwrap().len(), 2);
    assert_eq!(h.capture.calls(), 1);
}

#[tokio::test]
async fn failed_upload_keeps_image_and_retry_succeeds() {
    let h = harness(
        WorkflowConfig::detector(),
        FakeCapture::returning(vec![leaf("leaf.png")]),
        FakeInference::returning(vec![
            Err(UploadError::http(500, "model error")),
            Ok(outcome(vec![det("spot", 0.7)])),
        ]),
        false,
    );
    h.workflow.acquire_image(ImageSource::Gallery).await.unwrap();

    let err = h.workflow.diagnose().await.unwrap_err();
    assert_eq!(
        err,
        WorkflowError::Upload(UploadError::http(500, "model error"))
    );

    let failed = h.workflow.snapshot().await;
    assert_eq!(failed.phase, Phase::Error);
    assert_eq!(failed.image_ref.as_deref(), Some("file:///photos/leaf.png"));
    assert!(failed.detections.is_empty());
    assert_eq!(failed.error.as_deref(), Some("HTTP 500: model error"));
    assert!(!failed.show_weather);

    let retried = h.workflow.diagnose().await.unwrap();
    assert_eq!(retried.phase, Phase::ResultsReady);
    assert_eq!(retried.detections.len(), 1);
    assert!(retried.error.is_none());
    assert_eq!(h.inference.calls(), 2);
}

#[tokio::test]
async fn second_diagnose_while_uploading_is_refused() {
    let hold = Arc::new(Notify::new());
    let h = harness(
        WorkflowConfig::detector(),
        FakeCapture::returning(vec![leaf("leaf.jpg")]),
        FakeInference::held(vec![Ok(outcome(vec![det("rust", 0.9)]))], hold.clone()),
        false,
    );
    h.workflow.acquire_image(ImageSource::Camera).await.unwrap();

    let workflow = &h.workflow;
    let (first, second) = tokio::join!(workflow.diagnose(), async {
        until_in_flight(workflow).await;
        let second = workflow.diagnose().await;
        hold.notify_one();
        second
    });

    assert_eq!(
        second.unwrap_err(),
        WorkflowError::Transition(TransitionError::UploadInFlight)
    );
    assert_eq!(first.unwrap().phase, Phase::ResultsReady);
    assert_eq!(h.inference.calls(), 1);
}

#[tokio::test]
async fn result_for_replaced_image_is_discarded() {
    let hold = Arc::new(Notify::new());
    let h = harness(
        WorkflowConfig::detector(),
        FakeCapture::returning(vec![leaf("old.jpg"), leaf("new.jpg")]),
        FakeInference::held(vec![Ok(outcome(vec![det("rust", 0.9)]))], hold.clone()),
        false,
    );
    h.workflow.acquire_image(ImageSource::Camera).await.unwrap();

    let workflow = &h.workflow;
    let (first, replaced) = tokio::join!(workflow.diagnose(), async {
        until_in_flight(workflow).await;
        let replaced = workflow.acquire_image(ImageSource::Camera).await;
        hold.notify_one();
        replaced
    });

    assert!(replaced.unwrap());
    let snapshot = first.unwrap();
    assert_eq!(snapshot.phase, Phase::ImageReady);
    assert_eq!(snapshot.image_ref.as_deref(), Some("file:///photos/new.jpg"));
    assert!(snapshot.detections.is_empty());
    assert!(!snapshot.upload_in_flight);
}

#[tokio::test]
async fn cancelled_capture_leaves_session_untouched() {
    let h = harness(
        WorkflowConfig::detector(),
        FakeCapture::returning(vec![Err(CaptureError::Cancelled)]),
        FakeInference::returning(vec![]),
        false,
    );

    assert!(!h.workflow.acquire_image(ImageSource::Gallery).await.unwrap());

    let snapshot = h.workflow.snapshot().await;
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.image_ref.is_none());
}

#[tokio::test]
async fn denied_permission_is_returned_without_error_phase() {
    let denied = CaptureError::PermissionDenied {
        source_name: "camera".to_string(),
    };
    let h = harness(
        WorkflowConfig::detector(),
        FakeCapture::returning(vec![Err(denied.clone())]),
        FakeInference::returning(vec![]),
        false,
    );

    let err = h.workflow.acquire_image(ImageSource::Camera).await.unwrap_err();

    assert_eq!(err, WorkflowError::Capture(denied));
    let snapshot = h.workflow.snapshot().await;
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn picker_is_not_opened_before_crop_selection() {
    let h = harness(
        assistant(),
        FakeCapture::returning(vec![leaf("leaf.jpg")]),
        FakeInference::returning(vec![]),
        false,
    );

    let err = h.workflow.acquire_image(ImageSource::Gallery).await.unwrap_err();

    assert_eq!(err, WorkflowError::Transition(TransitionError::CropNotSelected));
    assert_eq!(h.capture.calls(), 0);
    assert_eq!(h.workflow.snapshot().await.phase, Phase::CropPending);
}

#[tokio::test]
async fn new_image_clears_previous_results() {
    let h = harness(
        WorkflowConfig::detector(),
        FakeCapture::returning(vec![leaf("a.jpg"), leaf("b.jpg")]),
        FakeInference::returning(vec![Ok(outcome(vec![det("rust", 0.9)]))]),
        false,
    );
    h.workflow.acquire_image(ImageSource::Camera).await.unwrap();
    h.workflow.diagnose().await.unwrap();

    h.workflow.acquire_image(ImageSource::Gallery).await.unwrap();

    let snapshot = h.workflow.snapshot().await;
    assert_eq!(snapshot.phase, Phase::ImageReady);
    assert_eq!(snapshot.image_ref.as_deref(), Some("file:///photos/b.jpg"));
    assert!(snapshot.detections.is_empty());
    assert!(!snapshot.show_weather);
}

#[tokio::test]
async fn weather_failure_is_shown_as_unavailable() {
    let h = harness(
        assistant(),
        FakeCapture::returning(vec![leaf("leaf.jpg")]),
        FakeInference::returning(vec![Ok(outcome(vec![det("blight", 0.6)]))]),
        true,
    );
    h.workflow.start().await;
    h.workflow.join_weather().await;
    h.workflow.select_crop("maize").await.unwrap();
    h.workflow.acquire_image(ImageSource::Camera).await.unwrap();

    let snapshot = h.workflow.diagnose().await.unwrap();

    assert_eq!(snapshot.phase, Phase::ResultsReady);
    assert_eq!(snapshot.weather, WeatherDisplay::Unavailable);
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn start_fetches_weather_once() {
    let h = harness(
        assistant(),
        FakeCapture::returning(vec![]),
        FakeInference::returning(vec![]),
        false,
    );

    h.workflow.start().await;
    h.workflow.start().await;
    h.workflow.join_weather().await;

    assert_eq!(h.weather.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_weather_refetches_only_after_moving() {
    let h = harness(
        assistant(),
        FakeCapture::returning(vec![]),
        FakeInference::returning(vec![]),
        false,
    );
    h.workflow.start().await;
    h.workflow.join_weather().await;

    h.workflow.refresh_weather().await;
    assert_eq!(h.weather.calls.load(Ordering::SeqCst), 1);

    *h.location.at.lock().unwrap() = Coordinates::new(12.45, 76.64);
    h.workflow.refresh_weather().await;
    assert_eq!(h.weather.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn refresh_during_start_up_fetch_does_not_fetch_again() {
    let h = harness(
        assistant(),
        FakeCapture::returning(vec![]),
        FakeInference::returning(vec![]),
        false,
    );

    h.workflow.start().await;
    h.workflow.refresh_weather().await;
    h.workflow.join_weather().await;

    assert_eq!(h.weather.calls.load(Ordering::SeqCst), 1);
    assert!(h.workflow.shared.session.read().await.weather().is_some());
}

#[tokio::test]
async fn refresh_is_a_no_op_when_weather_is_disabled() {
    let h = harness(
        WorkflowConfig::detector(),
        FakeCapture::returning(vec![]),
        FakeInference::returning(vec![]),
        false,
    );

    h.workflow.start().await;
    h.workflow.refresh_weather().await;

    assert_eq!(h.weather.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        *h.workflow.shared.session.read().await.weather_status(),
        WeatherStatus::NotRequested
    );
}

#[tokio::test]
async fn subscribers_see_every_transition() {
    let h = harness(
        WorkflowConfig::detector(),
        FakeCapture::returning(vec![leaf("leaf.jpg")]),
        FakeInference::returning(vec![]),
        false,
    );
    let mut updates = h.workflow.subscribe();
    assert_eq!(updates.borrow_and_update().phase, Phase::Idle);

    h.workflow.acquire_image(ImageSource::Camera).await.unwrap();

    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().phase, Phase::ImageReady);
}

#[tokio::test]
async fn detector_variant_requests_no_advice() {
    let h = harness(
        WorkflowConfig::detector(),
        FakeCapture::returning(vec![leaf("leaf.jpg")]),
        FakeInference::returning(vec![Ok(outcome(vec![det("rust", 0.9)]))]),
        false,
    );
    h.workflow.acquire_image(ImageSource::Camera).await.unwrap();

    let snapshot = h.workflow.diagnose().await.unwrap();

    assert!(h.advisory.calls.lock().unwrap().is_empty());
    assert!(snapshot.advice_status.is_empty());
    assert_eq!(snapshot.weather, WeatherDisplay::Hidden);
}

#[tokio::test]
async fn missing_advisory_service_marks_labels_unavailable() {
    let capture = FakeCapture::returning(vec![leaf("leaf.jpg")]);
    let services = WorkflowServices {
        capture: capture.clone(),
        inference: FakeInference::returning(vec![Ok(outcome(vec![det("blight", 0.5)]))]),
        advisory: None,
        location: None,
        weather: None,
    };
    let workflow = DiagnosisWorkflow::new(assistant(), services);
    workflow.start().await;
    workflow.select_crop("tomato").await.unwrap();
    workflow.acquire_image(ImageSource::Camera).await.unwrap();

    let snapshot = workflow.diagnose().await.unwrap();

    assert_eq!(snapshot.advice_status.len(), 1);
    assert_eq!(snapshot.advice_status[0].status, "unavailable");
    assert_eq!(snapshot.advice_status[0].advice, None);
    assert!(snapshot.advisory.is_empty());
    assert_eq!(snapshot.weather, WeatherDisplay::Unavailable);
}
