//! Logging setup for CropDx hosts.
//!
//! `init_tracing` installs an env-filtered console subscriber and returns a
//! channel of [`WorkflowLogEvent`]s for the presentation layer.

pub mod event_layer;
pub mod subscriber;

pub use event_layer::{WORKFLOW_TARGET_PREFIX, WorkflowEventLayer, WorkflowLogEvent};
pub use subscriber::{DEFAULT_LOG_FILTER, env_filter, init_tracing};
