use serde::{Deserialize, Serialize};

use super::defaults;
use crate::constants;
use crate::types::{MonitorPoint, Variable};

/// What each ingestion fetches and where raw values are sampled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Tracked variables.
    pub variables: Vec<Variable>,
    /// Lead hours requested from connectors.
    pub lead_hours: Vec<u32>,
    /// Monitoring locations for raw values and point metrics.
    pub monitor_points: Vec<MonitorPoint>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            variables: defaults::default_variables(),
            lead_hours: constants::default_lead_hours(),
            monitor_points: defaults::default_monitor_points(),
        }
    }
}
