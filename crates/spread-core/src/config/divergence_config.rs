use serde::{Deserialize, Serialize};

use super::defaults;

/// Grid divergence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DivergenceConfig {
    /// Common grid spacing in degrees.
    pub grid_resolution: f64,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            grid_resolution: defaults::DEFAULT_GRID_RESOLUTION,
        }
    }
}
