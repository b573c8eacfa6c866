//! Pause and cancel signals shared by a session's fetchers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Session-wide control flags.
///
/// Flags are level-triggered: setting one that is already set is a no-op, and
/// once cancelled a session stays cancelled.
#[derive(Debug, Default)]
pub struct SessionControl {
    paused: AtomicBool,
    cancelled: AtomicBool,
}

impl SessionControl {
    /// Create control flags with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend reads. Ignored once the session is cancelled.
    pub fn pause(&self) {
        if !self.is_cancelled() {
            self.paused.store(true, Ordering::SeqCst);
        }
    }

    /// Let paused fetchers continue.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Request cancellation. Also releases any paused fetchers.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Whether the session is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Whether the session has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Block while paused, polling every `interval`.
    ///
    /// Returns `false` if the session was cancelled, either before or during the wait.
    pub fn wait_while_paused(&self, interval: Duration) -> bool {
        while self.is_paused() {
            if self.is_cancelled() {
                return false;
            }
            thread::sleep(interval);
        }
        !self.is_cancelled()
    }
}
