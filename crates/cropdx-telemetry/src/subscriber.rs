//! Global subscriber setup.

use tokio::sync::mpsc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::event_layer::{WorkflowEventLayer, WorkflowLogEvent};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,cropdx_core=debug";

/// Filter from `RUST_LOG`, falling back to `default_filter`.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Installs the global subscriber: env filter, console output and the
/// workflow event layer.
///
/// # Returns
///
/// The receiving end of the workflow event channel. Fails when a global
/// subscriber is already set.
pub fn init_tracing(
    default_filter: &str,
) -> Result<mpsc::UnboundedReceiver<WorkflowLogEvent>, TryInitError> {
    let (events, receiver) = WorkflowEventLayer::channel();

    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt::layer().with_target(true))
        .with(events)
        .try_init()?;

    tracing::info!(target: "cropdx_telemetry", "tracing initialised");
    Ok(receiver)
}
