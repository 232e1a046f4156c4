//! Configuration errors.

use super::error_code::{self, SpreadErrorCode};

/// `field` is a dotted config path (`divergence.grid_resolution`) or the
/// environment variable that supplied the value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}")]
    FileNotFound { path: String },

    #[error("malformed TOML in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("{field} rejected: {message}")]
    ValidationFailed { field: String, message: String },

    #[error("{field} could not be parsed: {message}")]
    InvalidValue { field: String, message: String },
}

impl SpreadErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        error_code::CONFIG_ERROR
    }
}
