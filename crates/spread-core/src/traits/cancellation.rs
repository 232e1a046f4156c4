//! Cooperative cancellation for divergence recomputation.
//!
//! The scheduler polls the token between lead hours; an hour already being
//! computed or committed always finishes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub trait Cancellable {
    fn is_cancelled(&self) -> bool;

    fn cancel(&self);
}

/// Hand a clone to whoever may stop the run; all clones observe `cancel`.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cancellable for CancellationToken {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
