//! The ingestion permit: one semaphore shared by the orchestrator and the
//! divergence scheduler so heavy work never overlaps.

use std::sync::Arc;

use spread_core::errors::{EngineError, EngineResult};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Clones share the same semaphore.
#[derive(Debug, Clone)]
pub struct IngestionPermit {
    semaphore: Arc<Semaphore>,
}

impl IngestionPermit {
    /// At most `permits` holders at once.
    pub fn new(permits: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Binary permit: serializes all holders.
    pub fn single() -> Self {
        Self::new(1)
    }

    /// Never blocks in practice. For tests.
    pub fn unbounded() -> Self {
        Self::new(Semaphore::MAX_PERMITS)
    }

    /// Wait for a permit. Released when the guard drops.
    pub async fn acquire(&self) -> EngineResult<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| EngineError::Cancelled)
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for IngestionPermit {
    fn default() -> Self {
        Self::single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_permit_is_exclusive() {
        let permit = IngestionPermit::single();
        let held = permit.acquire().await.unwrap();
        assert_eq!(permit.available(), 0);
        drop(held);
        assert_eq!(permit.available(), 1);
    }
}
