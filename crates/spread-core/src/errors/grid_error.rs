//! Grid regridding and divergence errors.

use super::error_code::{self, SpreadErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// Fewer than two models could be placed on the common grid.
    #[error("need at least 2 models for {variable} divergence, got {available}")]
    InsufficientModels { variable: String, available: usize },

    #[error("grid resolution must be positive, got {resolution}")]
    InvalidResolution { resolution: f64 },
}

impl SpreadErrorCode for GridError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientModels { .. } => error_code::INSUFFICIENT_MODELS,
            Self::InvalidResolution { .. } => error_code::GRID_ERROR,
        }
    }
}
