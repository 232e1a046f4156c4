//! Alerting: rule evaluation against fresh divergence metrics, and webhook
//! delivery of the events that fire.

pub mod evaluate;
pub mod webhook;

pub use evaluate::{check_alerts, Observation};
pub use webhook::{AlertSummary, WebhookNotifier, WebhookPayload};
