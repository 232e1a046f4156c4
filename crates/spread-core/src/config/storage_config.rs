use std::path::Path;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Where runs, metrics and alert history live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file; parent directories are created on open.
    pub db_path: String,
    /// Read-only connections serving status and history lookups (1..=8).
    pub read_pool_size: usize,
}

impl StorageConfig {
    pub fn db_path(&self) -> &Path {
        Path::new(&self.db_path)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: defaults::DEFAULT_DB_PATH.to_string(),
            read_pool_size: defaults::DEFAULT_READ_POOL_SIZE,
        }
    }
}
