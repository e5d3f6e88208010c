//! Tracing layer that streams workflow events to the presentation layer.
//!
//! Events from the `cropdx_*` crates are converted into [`WorkflowLogEvent`]s
//! and pushed onto an unbounded channel, so a UI can show progress and
//! degraded results (advice unavailable, weather failed) as they happen.

use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Target prefix of the events this layer forwards.
pub const WORKFLOW_TARGET_PREFIX: &str = "cropdx";

/// Event data sent to the presentation layer
#[derive(Debug, Clone, serde::Serialize)]
pub struct WorkflowLogEvent {
    /// Event target (e.g., "cropdx_application::workflow")
    pub target: String,
    /// Log level (INFO, DEBUG, WARN, ERROR)
    pub level: String,
    pub message: String,
    /// Structured fields such as `label`, `status` or `session_id`
    pub fields: HashMap<String, Value>,
    /// Fields of the enclosing span, if any
    pub span: HashMap<String, Value>,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

/// Span fields recorded at span creation, stored in the span's extensions.
struct SpanFields(HashMap<String, Value>);

/// A tracing layer that sends workflow events to a channel
pub struct WorkflowEventLayer {
    sender: mpsc::UnboundedSender<WorkflowLogEvent>,
    target_prefix: String,
}

impl WorkflowEventLayer {
    pub fn new(sender: mpsc::UnboundedSender<WorkflowLogEvent>) -> Self {
        Self {
            sender,
            target_prefix: WORKFLOW_TARGET_PREFIX.to_string(),
        }
    }

    /// Creates the layer together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WorkflowLogEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }

    /// Forwards events whose target starts with `prefix` instead.
    pub fn with_target_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.target_prefix = prefix.into();
        self
    }

    fn accepts(&self, target: &str) -> bool {
        target.starts_with(&self.target_prefix)
    }
}

impl<S> Layer<S> for WorkflowEventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if !self.accepts(attrs.metadata().target()) {
            return;
        }
        let mut fields = HashMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanFields(fields));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if !self.accepts(event.metadata().target()) {
            return;
        }

        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        let mut span_fields = HashMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            // Outermost first so inner spans override on name clashes.
            for span in scope.from_root() {
                if let Some(stored) = span.extensions().get::<SpanFields>() {
                    span_fields.extend(stored.0.clone());
                }
            }
        }

        let message = fields
            .remove("message")
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default();

        let workflow_event = WorkflowLogEvent {
            target: event.metadata().target().to_string(),
            level: event.metadata().level().to_string(),
            message,
            fields,
            span: span_fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // Receiver gone means nobody is listening any more.
        let _ = self.sender.send(workflow_event);
    }
}

/// Field visitor that extracts tracing fields into a HashMap
struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(
            field.name().to_string(),
            serde_json::json!(format!("{:?}", value)),
        );
    }
}
