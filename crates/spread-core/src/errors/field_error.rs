//! Errors for field construction and point extraction.

use super::error_code::{self, SpreadErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("variable {variable} not present in field set")]
    MissingVariable { variable: String },

    #[error("field {variable} carries no latitude/longitude coordinates")]
    MissingCoordinate { variable: String },

    #[error("shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("field has no cells")]
    Empty,
}

impl SpreadErrorCode for FieldError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingVariable { .. } => error_code::MISSING_VARIABLE,
            Self::MissingCoordinate { .. } => error_code::MISSING_COORDINATE,
            Self::ShapeMismatch { .. } | Self::Empty => error_code::FIELD_ERROR,
        }
    }
}
