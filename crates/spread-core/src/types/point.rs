//! Named monitoring locations.

use serde::{Deserialize, Serialize};

/// A fixed location where point metrics and raw values are recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorPoint {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl MonitorPoint {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }
}
