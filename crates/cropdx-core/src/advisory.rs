//! Treatment advisory boundary and per-label status.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AdvisoryError;

/// Where the advice for one detected label stands.
///
/// `Unavailable` and `Pending` are both "no text to show", but they are kept
/// apart so a display can tell a failed lookup from one still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "advice", rename_all = "snake_case")]
pub enum AdviceStatus {
    Pending,
    Ready(String),
    Unavailable,
}

impl AdviceStatus {
    pub fn text(&self) -> Option<&str> {
        match self {
            AdviceStatus::Ready(text) => Some(text),
            AdviceStatus::Pending | AdviceStatus::Unavailable => None,
        }
    }
}

/// Looks up treatment guidance for one crop/label pair.
#[async_trait]
pub trait AdvisoryService: Send + Sync {
    async fn treatment_advice(&self, crop: &str, label: &str) -> Result<String, AdvisoryError>;
}
