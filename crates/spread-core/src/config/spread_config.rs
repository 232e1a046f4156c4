//! Top-level configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{
    AlertConfig, DivergenceConfig, IngestionConfig, ObservabilityConfig, SnapshotConfig,
    StorageConfig,
};
use crate::errors::ConfigError;

/// Name of the project config file looked up by [`SpreadConfig::load`].
pub const CONFIG_FILE_NAME: &str = "spread.toml";

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`SPREAD_*`)
/// 2. Project config (`spread.toml` in the given root)
/// 3. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SpreadConfig {
    pub storage: StorageConfig,
    pub snapshots: SnapshotConfig,
    pub ingestion: IngestionConfig,
    pub divergence: DivergenceConfig,
    pub alerts: AlertConfig,
    pub observability: ObservabilityConfig,
}

impl SpreadConfig {
    /// Load configuration: defaults, then `spread.toml` in `root` if present,
    /// then `SPREAD_*` environment overrides. The result is validated.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        // Every section is `#[serde(default)]`, so keys absent from the file
        // keep their compiled defaults.
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Apply `SPREAD_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("SPREAD_DB_PATH") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("SPREAD_DATA_STORE_PATH") {
            self.snapshots.data_store_path = val;
        }
        if let Ok(val) = std::env::var("SPREAD_GRID_RESOLUTION") {
            self.divergence.grid_resolution =
                val.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "SPREAD_GRID_RESOLUTION".to_string(),
                    message: format!("not a number: {val}"),
                })?;
        }
        if let Ok(val) = std::env::var("SPREAD_ALERTS_ENABLED") {
            self.alerts.enabled = parse_bool(&val).ok_or_else(|| ConfigError::InvalidValue {
                field: "SPREAD_ALERTS_ENABLED".to_string(),
                message: format!("not a boolean: {val}"),
            })?;
        }
        if let Ok(val) = std::env::var("SPREAD_ALERT_WEBHOOK_URL") {
            self.alerts.webhook_url = if val.trim().is_empty() { None } else { Some(val) };
        }
        if let Ok(val) = std::env::var("SPREAD_LOG_LEVEL") {
            self.observability.log_level = val;
        }
        Ok(())
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let resolution = self.divergence.grid_resolution;
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(ConfigError::ValidationFailed {
                field: "divergence.grid_resolution".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.ingestion.variables.is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "ingestion.variables".to_string(),
                message: "at least one variable must be tracked".to_string(),
            });
        }
        for point in &self.ingestion.monitor_points {
            if !(-90.0..=90.0).contains(&point.lat) || !(-180.0..=360.0).contains(&point.lon) {
                return Err(ConfigError::ValidationFailed {
                    field: "ingestion.monitor_points".to_string(),
                    message: format!("{} is out of range ({}, {})", point.name, point.lat, point.lon),
                });
            }
        }
        if self.alerts.webhook_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed {
                field: "alerts.webhook_timeout_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
