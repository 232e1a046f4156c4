//! Tracing setup: structured logging and event helpers.

pub mod events;

use tracing_subscriber::EnvFilter;

use crate::config::ObservabilityConfig;

/// Environment variable consulted for the log filter.
pub const LOG_ENV_VAR: &str = "SPREAD_LOG";

/// Initialize the tracing subscriber with structured JSON output.
///
/// Respects `SPREAD_LOG` for filtering, defaulting to `info`. Calling this
/// more than once is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .try_init();
}

/// Initialize tracing from config. `SPREAD_LOG` still wins over `log_level`.
pub fn init_tracing_from_config(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let _ = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Initialize tracing with a custom filter string (for testing or embedding).
pub fn init_tracing_with_filter(filter: &str) {
    let filter = EnvFilter::new(filter);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_test_writer()
        .try_init();
}
