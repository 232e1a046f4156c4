//! Offloading synchronous work (connectors, SQLite, numerics) to the
//! blocking thread pool.

use spread_core::errors::{EngineError, EngineResult};

/// Run `f` on the blocking pool. A panicked or aborted task becomes
/// `EngineError::Task`.
pub(crate) async fn run_blocking<F, T>(f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EngineError::Task {
            message: e.to_string(),
        })?
}
