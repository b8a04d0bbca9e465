//! Cooperative cancellation shared by every task in a run

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Broadcast-readable abort flag.
///
/// Clones share the same flag. Setting it never interrupts anything; tasks
/// poll it at I/O boundaries and the engine stops starting new tasks.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal; idempotent
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
