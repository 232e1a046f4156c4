use serde::{Deserialize, Serialize};

use super::defaults;

/// Grid snapshot array store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Root directory; artifacts live under `<root>/divergence/`.
    pub data_store_path: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            data_store_path: defaults::DEFAULT_DATA_STORE_PATH.to_string(),
        }
    }
}
