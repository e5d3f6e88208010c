//! Per-label treatment advice, fetched concurrently and tolerant of failures.

use cropdx_core::advisory::AdvisoryService;
use cropdx_core::error::AdvisoryError;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one label's advisory request.
pub type LabelOutcome = (String, Result<String, AdvisoryError>);

/// Issues one advisory request per unique label.
#[derive(Clone)]
pub struct AdvisoryFetcher {
    service: Arc<dyn AdvisoryService>,
}

impl AdvisoryFetcher {
    pub fn new(service: Arc<dyn AdvisoryService>) -> Self {
        Self { service }
    }

    /// Starts every request at once and yields outcomes as they complete.
    ///
    /// Requests are independent: a slow or failing label never holds back
    /// the others.
    pub fn requests<'a>(
        &'a self,
        crop: &'a str,
        labels: &[String],
    ) -> FuturesUnordered<BoxFuture<'a, LabelOutcome>> {
        let mut seen = HashSet::new();
        labels
            .iter()
            .filter(|label| seen.insert(label.as_str()))
            .map(|label| {
                let label = label.clone();
                let service = Arc::clone(&self.service);
                async move {
                    let result = service.treatment_advice(crop, &label).await;
                    (label, result)
                }
                .boxed()
            })
            .collect()
    }

    /// Collects advice for all labels. Failed labels are simply absent.
    pub async fn fetch_advice(&self, crop: &str, labels: &[String]) -> HashMap<String, String> {
        let mut pending = self.requests(crop, labels);
        let mut advice = HashMap::new();

        while let Some((label, result)) = pending.next().await {
            match result {
                Ok(text) => {
                    debug!(%label, "advice received");
                    advice.insert(label, text);
                }
                Err(err) => warn!(%label, error = %err, "advice unavailable"),
            }
        }

        advice
    }
}
