//! Errors from the grid snapshot array store.

use super::error_code::{self, SpreadErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error at {path}: {message}")]
    Io { path: String, message: String },

    #[error("snapshot metadata invalid at {path}: {message}")]
    InvalidMetadata { path: String, message: String },

    #[error("snapshot chunk corrupt at {path}: {message}")]
    CorruptChunk { path: String, message: String },
}

impl SpreadErrorCode for SnapshotError {
    fn error_code(&self) -> &'static str {
        error_code::SNAPSHOT_ERROR
    }
}
