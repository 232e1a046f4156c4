//! Storage-layer errors for SQLite operations.

use super::error_code::{self, SpreadErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("migration failed at version {version}: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("invalid stored value in {column}: {value}")]
    InvalidValue { column: String, value: String },
}

impl SpreadErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::SqliteError { .. } | Self::InvalidValue { .. } => error_code::STORAGE_ERROR,
            Self::MigrationFailed { .. } => error_code::MIGRATION_FAILED,
            Self::NotFound { .. } => error_code::NOT_FOUND,
        }
    }
}
