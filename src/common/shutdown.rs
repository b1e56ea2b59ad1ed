//! Shutdown token
//!
//! A cloneable, one-shot cancellation flag shared between the interrupt
//! handler and whatever is currently dialing or relaying. Triggering is
//! idempotent, and waiters that arrive after the trigger return at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

struct ShutdownState {
    triggered: AtomicBool,
    notify: Notify,
}

/// Shared shutdown signal
#[derive(Clone)]
pub struct Shutdown {
    state: Arc<ShutdownState>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            state: Arc::new(ShutdownState {
                triggered: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Fire the signal. Calling this more than once has no further effect.
    pub fn trigger(&self) {
        self.state.triggered.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.state.triggered.load(Ordering::SeqCst)
    }

    /// Wait until the signal fires
    pub async fn triggered(&self) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent trigger is not lost
            notified.as_mut().enable();

            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shutdown")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}
