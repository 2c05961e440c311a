use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag
///
/// Once triggered, workers stop taking new tasks; the ones in flight finish
/// and are committed.
#[derive(Debug, Clone, Default)]
pub struct DrainSignal {
    flag: Arc<AtomicBool>,
}

impl DrainSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_draining(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
