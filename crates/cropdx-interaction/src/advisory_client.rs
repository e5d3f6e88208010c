//! HttpAdvisoryClient - treatment advice lookups.

use async_trait::async_trait;
use cropdx_core::advisory::AdvisoryService;
use cropdx_core::config::AdvisoryConfig;
use cropdx_core::error::{AdvisoryError, CropDxError};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::inference_client::trim_base_url;

/// Calls `GET {base_url}/treatment-advice?crop=..&label=..`.
#[derive(Clone)]
pub struct HttpAdvisoryClient {
    client: Client,
    base_url: String,
}

impl HttpAdvisoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: trim_base_url(base_url.into()),
        }
    }

    /// Builds a client from the `[advisory]` config section.
    pub fn from_config(config: &AdvisoryConfig) -> Result<Self, CropDxError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            CropDxError::config(format!("Failed to build advisory HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            base_url: trim_base_url(config.base_url.clone()),
        })
    }
}

#[derive(Deserialize)]
struct AdviceResponse {
    advice: String,
}

#[async_trait]
impl AdvisoryService for HttpAdvisoryClient {
    async fn treatment_advice(&self, crop: &str, label: &str) -> Result<String, AdvisoryError> {
        let request_error = |message: String| AdvisoryError::Request {
            label: label.to_string(),
            message,
        };

        let response = self
            .client
            .get(format!("{}/treatment-advice", self.base_url))
            .query(&[("crop", crop), ("label", label)])
            .send()
            .await
            .map_err(|err| request_error(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(request_error(format!("HTTP {}: {body}", status.as_u16())));
        }

        let parsed: AdviceResponse =
            response
                .json()
                .await
                .map_err(|err| AdvisoryError::Malformed {
                    label: label.to_string(),
                    message: err.to_string(),
                })?;

        Ok(parsed.advice)
    }
}
