//! Alert notification errors. Logged and swallowed by callers.

use super::error_code::{self, SpreadErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("webhook returned status {status}")]
    BadStatus { status: u16 },
}

impl SpreadErrorCode for NotifyError {
    fn error_code(&self) -> &'static str {
        error_code::NOTIFY_ERROR
    }
}
