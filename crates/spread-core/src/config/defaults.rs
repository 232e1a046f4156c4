// Single source of truth for all default values.

use crate::types::{MonitorPoint, Variable};

// --- Storage ---
pub const DEFAULT_DB_PATH: &str = "spread.db";
pub const DEFAULT_READ_POOL_SIZE: usize = 4;

// --- Snapshots ---
pub const DEFAULT_DATA_STORE_PATH: &str = "./data";

// --- Divergence ---
pub const DEFAULT_GRID_RESOLUTION: f64 = 0.25;

// --- Alerts ---
pub const DEFAULT_ALERTS_ENABLED: bool = true;
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;

// --- Observability ---
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_JSON_LOGS: bool = true;

pub fn default_variables() -> Vec<Variable> {
    Variable::ALL.to_vec()
}

pub fn default_monitor_points() -> Vec<MonitorPoint> {
    vec![
        MonitorPoint::new("New York", 40.7128, -74.0060),
        MonitorPoint::new("Los Angeles", 34.0522, -118.2437),
        MonitorPoint::new("Chicago", 41.8781, -87.6298),
        MonitorPoint::new("Houston", 29.7604, -95.3698),
        MonitorPoint::new("Seattle", 47.6062, -122.3321),
        MonitorPoint::new("Denver", 39.7392, -104.9903),
        MonitorPoint::new("Miami", 25.7617, -80.1918),
        MonitorPoint::new("Washington DC", 38.9072, -77.0369),
    ]
}
