use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Alert evaluation and webhook notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Evaluate rules after each lead hour.
    pub enabled: bool,
    /// Webhook target. No URL means notifications are skipped.
    pub webhook_url: Option<String>,
    /// Per-request timeout in seconds.
    pub webhook_timeout_secs: u64,
}

impl AlertConfig {
    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::DEFAULT_ALERTS_ENABLED,
            webhook_url: None,
            webhook_timeout_secs: defaults::DEFAULT_WEBHOOK_TIMEOUT_SECS,
        }
    }
}
