//! Process-wide run flag.
//!
//! Every long-running task loop checks this flag once per iteration and
//! exits when it goes false. Signal handlers do nothing but clear it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Clonable handle on the shared running flag.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    /// Create a new flag in the running state.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// True while the process should keep running.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Request shutdown. Safe to call from a signal handler; this is a
    /// single atomic store.
    #[inline]
    pub fn shut_down(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}
