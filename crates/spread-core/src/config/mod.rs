//! Configuration system.
//! TOML-based, layered resolution: env > `spread.toml` > compiled defaults.

pub mod alert_config;
pub mod defaults;
pub mod divergence_config;
pub mod ingestion_config;
pub mod observability_config;
pub mod snapshot_config;
pub mod spread_config;
pub mod storage_config;

pub use alert_config::AlertConfig;
pub use divergence_config::DivergenceConfig;
pub use ingestion_config::IngestionConfig;
pub use observability_config::ObservabilityConfig;
pub use snapshot_config::SnapshotConfig;
pub use spread_config::SpreadConfig;
pub use storage_config::StorageConfig;
