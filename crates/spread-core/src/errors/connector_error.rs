//! Errors raised by model data connectors.

use super::error_code::{self, SpreadErrorCode};

/// Connector failures. Recoverable: isolated to one model (ingest) or one
/// model at one lead hour (divergence).
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("no connector registered for model {model}")]
    NotRegistered { model: String },

    #[error("unknown model: {name}")]
    UnknownModel { name: String },

    #[error("fetch failed for {model}: {message}")]
    FetchFailed { model: String, message: String },

    #[error("decode failed for {model}: {message}")]
    DecodeFailed { model: String, message: String },
}

impl SpreadErrorCode for ConnectorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotRegistered { .. } | Self::UnknownModel { .. } => error_code::UNKNOWN_MODEL,
            Self::FetchFailed { .. } | Self::DecodeFailed { .. } => error_code::CONNECTOR_ERROR,
        }
    }
}
