//! Engine errors. Aggregates subsystem errors via `From` conversions.

use super::error_code::{self, SpreadErrorCode};
use super::{
    ConfigError, ConnectorError, FieldError, GridError, NotifyError, SnapshotError, StorageError,
};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Field error: {0}")]
    Field(#[from] FieldError),

    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("blocking task failed: {message}")]
    Task { message: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl SpreadErrorCode for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Connector(e) => e.error_code(),
            Self::Field(e) => e.error_code(),
            Self::Grid(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::Snapshot(e) => e.error_code(),
            Self::Notify(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
            Self::Task { .. } => error_code::TASK_FAILED,
            Self::Cancelled => error_code::CANCELLED,
        }
    }
}
