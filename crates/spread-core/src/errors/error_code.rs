//! SpreadErrorCode trait for structured log fields.

/// Every error enum implements this to provide a stable code string
/// that is attached to structured log events.
pub trait SpreadErrorCode {
    /// Returns the error code string (e.g., "STORAGE_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted error string: `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const FIELD_ERROR: &str = "FIELD_ERROR";
pub const MISSING_COORDINATE: &str = "MISSING_COORDINATE";
pub const MISSING_VARIABLE: &str = "MISSING_VARIABLE";
pub const GRID_ERROR: &str = "GRID_ERROR";
pub const INSUFFICIENT_MODELS: &str = "INSUFFICIENT_MODELS";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const SNAPSHOT_ERROR: &str = "SNAPSHOT_ERROR";
pub const CONNECTOR_ERROR: &str = "CONNECTOR_ERROR";
pub const UNKNOWN_MODEL: &str = "UNKNOWN_MODEL";
pub const NOTIFY_ERROR: &str = "NOTIFY_ERROR";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const CANCELLED: &str = "CANCELLED";
pub const TASK_FAILED: &str = "TASK_FAILED";
