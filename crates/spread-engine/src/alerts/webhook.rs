//! Webhook delivery of fired alert events.
//!
//! One POST per evaluation batch. Delivery failures are logged and never
//! propagate into divergence processing.

use serde::Serialize;
use spread_core::config::AlertConfig;
use spread_core::constants::ENGINE_NAME;
use spread_core::errors::{NotifyError, SpreadErrorCode};
use spread_core::tracing_setup::events;
use spread_core::types::Variable;
use spread_storage::queries::alerts::AlertEventRow;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub text: String,
    pub alerts: Vec<AlertSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSummary {
    pub variable: Variable,
    pub value: f64,
    pub lat: f64,
    pub lon: f64,
    pub location: Option<String>,
    pub lead_hour: u32,
}

impl WebhookPayload {
    pub fn from_events(events: &[AlertEventRow]) -> Self {
        Self {
            text: format!("{ENGINE_NAME}: {} alert(s) triggered", events.len()),
            alerts: events
                .iter()
                .map(|e| AlertSummary {
                    variable: e.variable,
                    value: e.value,
                    lat: e.lat,
                    lon: e.lon,
                    location: e.location_label.clone(),
                    lead_hour: e.lead_hour,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    target: Option<(reqwest::Client, String)>,
}

impl WebhookNotifier {
    /// Notifier for the configured URL; a no-op when none is set.
    pub fn from_config(config: &AlertConfig) -> Result<Self, NotifyError> {
        let Some(url) = config.webhook_url.as_ref().filter(|u| !u.is_empty()) else {
            return Ok(Self::disabled());
        };
        let client = reqwest::Client::builder()
            .timeout(config.webhook_timeout())
            .gzip(true)
            .build()
            .map_err(|e| NotifyError::RequestFailed {
                reason: e.to_string(),
            })?;
        Ok(Self {
            target: Some((client, url.clone())),
        })
    }

    pub fn disabled() -> Self {
        Self { target: None }
    }

    pub fn is_configured(&self) -> bool {
        self.target.is_some()
    }

    /// POST the batch. `Ok(false)` when nothing was sent (no URL or no
    /// events).
    pub async fn send(&self, fired: &[AlertEventRow]) -> Result<bool, NotifyError> {
        let Some((client, url)) = &self.target else {
            return Ok(false);
        };
        if fired.is_empty() {
            return Ok(false);
        }
        let payload = WebhookPayload::from_events(fired);
        let response = client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::RequestFailed {
                reason: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::BadStatus {
                status: status.as_u16(),
            });
        }
        tracing::debug!(count = fired.len(), "alert webhook delivered");
        Ok(true)
    }

    /// `send`, with failures logged and swallowed.
    pub async fn notify(&self, fired: &[AlertEventRow]) {
        if let Err(e) = self.send(fired).await {
            events::notification_failed(e.error_code(), &e.to_string());
        }
    }
}
