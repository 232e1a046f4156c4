//! spread-storage: SQLite persistence for runs, raw point values, pairwise
//! metrics, grid snapshot rows, alert rules, and alert events.

pub mod connection;
pub mod migrations;
pub mod queries;

pub use connection::DatabaseManager;

use spread_core::errors::StorageError;

/// Wrap any error message as a `StorageError::SqliteError`.
pub fn to_storage_err(message: impl Into<String>) -> StorageError {
    StorageError::SqliteError {
        message: message.into(),
    }
}
