//! HTTP adapter for the Inngest event and registration APIs.

use std::time::Duration;

use async_trait::async_trait;
use common::protocol::DispatchAccepted;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{
    event::DispatchedEvent, manifest::Manifest, signature::hashed_signing_key, DispatchError,
    JobBus, RegistrationOutcome,
};
use crate::config::InngestConfig;

/// Upper bound on a single enqueue or registration call.
const BUS_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Submits events to `POST {base_url}/e/{event_key}`.
#[derive(Clone)]
pub struct InngestClient {
    http: reqwest::Client,
    event_url: String,
    register_url: String,
    signing_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    #[serde(default)]
    modified: bool,
}

impl InngestClient {
    /// Build a client from configuration. No network I/O happens here.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(cfg: &InngestConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(BUS_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            event_url: format!("{}/e/{}", cfg.base_url, cfg.event_key),
            register_url: format!("{}/fn/register", cfg.api_base_url),
            signing_key: cfg.signing_key.clone(),
        })
    }
}

#[async_trait]
impl JobBus for InngestClient {
    async fn submit_batch(
        &self,
        events: &[DispatchedEvent],
    ) -> Result<DispatchAccepted, DispatchError> {
        if events.is_empty() {
            return Ok(DispatchAccepted::default());
        }

        let resp = self
            .http
            .post(&self.event_url)
            .json(events)
            .send()
            .await
            .map_err(|e| DispatchError::Unreachable(Box::new(e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), count = events.len(), "job bus rejected events");
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let accepted: DispatchAccepted = resp
            .json()
            .await
            .map_err(|e| DispatchError::InvalidResponse(e.to_string()))?;
        debug!(ids = ?accepted.ids, "events accepted by job bus");
        Ok(accepted)
    }

    async fn register(&self, manifest: &Manifest) -> Result<RegistrationOutcome, DispatchError> {
        let mut req = self.http.post(&self.register_url).json(manifest);
        if let Some(key) = &self.signing_key {
            req = req.bearer_auth(hashed_signing_key(key));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| DispatchError::Unreachable(Box::new(e)))?;

        let status = resp.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = resp.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RegisterResponse = resp
            .json()
            .await
            .map_err(|e| DispatchError::InvalidResponse(e.to_string()))?;
        Ok(RegistrationOutcome {
            modified: parsed.modified,
        })
    }
}
