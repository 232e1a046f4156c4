//! Error handling for the divergence engine.
//! One error enum per subsystem, `thiserror` only.

pub mod config_error;
pub mod connector_error;
pub mod engine_error;
pub mod error_code;
pub mod field_error;
pub mod grid_error;
pub mod notify_error;
pub mod snapshot_error;
pub mod storage_error;

pub use config_error::ConfigError;
pub use connector_error::ConnectorError;
pub use engine_error::{EngineError, EngineResult};
pub use error_code::SpreadErrorCode;
pub use field_error::FieldError;
pub use grid_error::GridError;
pub use notify_error::NotifyError;
pub use snapshot_error::SnapshotError;
pub use storage_error::StorageError;
